pub mod gpio;
pub mod sim;

use bit_layer::{BusConfig, Error};

/// Drives and samples the two open-drain bus lines.
///
/// "High" is never driven: releasing a line lets the pull-up float it high,
/// so a slave can still hold it low. Implementations must switch a line from
/// floating to driven-low without passing through a driven-high state.
pub trait LineInterface {
    /// Takes hold of the lines named in `config`. Called by `SoftWire::begin`.
    fn attach(&mut self, _config: &BusConfig) -> Result<(), Error> {
        Ok(())
    }

    /// Returns both lines to plain inputs.
    fn detach(&mut self) {}

    fn sda_low(&mut self);
    fn sda_high(&mut self);
    fn scl_low(&mut self);
    fn scl_high(&mut self);

    /// `true` when SDA reads high.
    fn read_sda(&mut self) -> bool;
    /// `true` when SCL reads high.
    fn read_scl(&mut self) -> bool;
}
