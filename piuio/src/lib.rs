mod board;
mod error;
mod handler;
mod lights;

pub use {board::*, error::*, handler::*, lights::*};

/// The four multiplexed sensor sets, in scan-phase order.
#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display, strum::EnumIter, strum::FromRepr)]
#[strum(serialize_all = "lowercase")]
pub enum Sensor {
    Right,
    Left,
    Bottom,
    Top,
}

/// The sensors that reported one logical button during a scan.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorSet(u8);

impl SensorSet {
    pub fn insert(&mut self, sensor: Sensor) {
        self.0 |= 1 << sensor as u8;
    }

    pub fn contains(self, sensor: Sensor) -> bool {
        self.0 & (1 << sensor as u8) != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn iter(self) -> impl Iterator<Item = Sensor> {
        <Sensor as strum::IntoEnumIterator>::iter().filter(move |&sensor| self.contains(sensor))
    }
}

impl std::fmt::Display for SensorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for sensor in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{sensor}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SensorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SensorSet({self})")
    }
}
