#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not establish a connection with the PIUIO board")]
    BoardNotFound,
    #[error("redundant PIUIO driver loaded")]
    RedundantInstance,
    #[error("usb transfer failed: {0}")]
    Transport(String),
}
