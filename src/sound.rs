use crate::machine::Component;

/// Latches the sound command bits written to ports 3 and 5 so a host
/// audio backend can poll them. Port 6 is the watchdog reset and is
/// absorbed.
pub struct Sound {
    pub bank1: u8,
    pub bank2: u8,
}

impl Component for Sound {
    fn out_u8(&mut self, port: u8, data: u8) -> bool {
        match port {
            3 => self.bank1 = data,
            5 => self.bank2 = data,
            6 => {} // watchdog
            _ => return false,
        }
        true
    }
}

impl Sound {
    pub fn default() -> Self {
        Sound {
            bank1: 0,
            bank2: 0,
        }
    }
}
