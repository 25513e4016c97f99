pub trait ReadExt {
    fn read_magic(&mut self) -> Result<[u8; 2], super::Error>;
    fn read_block(&mut self) -> Result<[u8; 16], super::Error>;
    fn read_len(&mut self, len: usize) -> Result<Vec<u8>, super::Error>;
}

impl<R: std::io::Read> ReadExt for R {
    fn read_magic(&mut self) -> Result<[u8; 2], super::Error> {
        let mut magic = [0; 2];
        self.read_exact(&mut magic)?;
        Ok(magic)
    }

    fn read_block(&mut self) -> Result<[u8; 16], super::Error> {
        let mut block = [0; 16];
        self.read_exact(&mut block)?;
        Ok(block)
    }

    fn read_len(&mut self, len: usize) -> Result<Vec<u8>, super::Error> {
        let mut buf = vec![0; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}
