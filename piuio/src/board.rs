use super::Error;

/// A PIUIO USB board, already discovered. Enumeration and hot-plug live
/// with the implementation; the handler only claims the device and drives
/// transfers.
pub trait UsbBoard: Send {
    /// Claims the device for I/O.
    fn open(&mut self) -> Result<(), Error>;

    /// Releases the device.
    fn close(&mut self);

    /// One 32-bit output report: lights plus the sensor-set selector.
    fn write(&mut self, data: u32) -> Result<(), Error>;

    /// One 32-bit input report for the currently selected sensor set.
    fn read(&mut self) -> Result<u32, Error>;

    /// Four write/read pairs in flight at once. Even slots carry the output
    /// words going in and are overwritten with the matching input words.
    fn bulk_read_write(&mut self, data: &mut [u32; 8]) -> Result<(), Error>;
}
