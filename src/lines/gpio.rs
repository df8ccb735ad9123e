use critical_section;
use rppal::gpio::{Gpio, IoPin, Level, Mode, PullUpDown};

use bit_layer::{BusConfig, Error};
use super::LineInterface;

/// One open-drain line on a Raspberry Pi GPIO pin.
pub struct I2CPin {
    hw_pin: IoPin,
}

impl I2CPin {
    pub fn new(gpio: &Gpio, pin_number: u8, pullups: bool) -> Result<Self, Error> {
        let mut hw_pin = gpio.get(pin_number)?.into_io(Mode::Input);
        hw_pin.set_pullupdown(if pullups { PullUpDown::PullUp } else { PullUpDown::Off });

        Ok(I2CPin { hw_pin })
    }

    pub fn read(&self) -> bool {
        self.hw_pin.read() == Level::High
    }

    /// `false` drives the line low, `true` releases it.
    pub fn write(&mut self, value: bool) {
        if value {
            self.hw_pin.set_mode(Mode::Input);
        } else {
            let hw_pin = &mut self.hw_pin;
            // Latch low before switching direction so the pin never drives high.
            critical_section::with(|_| {
                hw_pin.set_low();
                hw_pin.set_mode(Mode::Output);
            });
        }
    }

    pub fn reset(&mut self) {
        self.write(true)
    }
}

/// Lines on the Raspberry Pi GPIO header.
///
/// Nothing touches the hardware until `attach`; line operations before that
/// are ignored and sample as high.
pub struct GpioLines {
    sda: Option<I2CPin>,
    scl: Option<I2CPin>,
}

impl GpioLines {
    pub fn new() -> Self {
        GpioLines {
            sda: None,
            scl: None,
        }
    }

    fn write(pin: &mut Option<I2CPin>, value: bool) {
        if let Some(ref mut pin) = *pin {
            pin.write(value);
        }
    }

    fn read(pin: &Option<I2CPin>) -> bool {
        pin.as_ref().map_or(true, I2CPin::read)
    }
}

impl Default for GpioLines {
    fn default() -> Self {
        GpioLines::new()
    }
}

impl LineInterface for GpioLines {
    fn attach(&mut self, config: &BusConfig) -> Result<(), Error> {
        self.detach();

        let gpio = Gpio::new().map_err(|e| {
            error!("Could not open GPIO: {}", e);
            e
        })?;
        info!("Attaching sda to GPIO {} and scl to GPIO {} (pull-ups {})",
              config.sda, config.scl, if config.pullups { "on" } else { "off" });

        self.sda = Some(I2CPin::new(&gpio, config.sda, config.pullups)?);
        self.scl = Some(I2CPin::new(&gpio, config.scl, config.pullups)?);

        Ok(())
    }

    fn detach(&mut self) {
        if let Some(mut pin) = self.sda.take() {
            pin.reset();
        }
        if let Some(mut pin) = self.scl.take() {
            pin.reset();
        }
    }

    fn sda_low(&mut self) {
        GpioLines::write(&mut self.sda, false)
    }

    fn sda_high(&mut self) {
        GpioLines::write(&mut self.sda, true)
    }

    fn scl_low(&mut self) {
        GpioLines::write(&mut self.scl, false)
    }

    fn scl_high(&mut self) {
        GpioLines::write(&mut self.scl, true)
    }

    fn read_sda(&mut self) -> bool {
        GpioLines::read(&self.sda)
    }

    fn read_scl(&mut self) -> bool {
        GpioLines::read(&self.scl)
    }
}
