//! Raspberry Pi drivers (rppal): HC-SR04 pair, MCP3008 line ADC, dual
//! H-bridge with software PWM, and interrupt-driven wheel encoders.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use sumo_traits::{DriveMode, DriveMotors, Encoders, LineSensor, OUT_OF_RANGE, RangeSensor, Side, Wheel};
use tracing::trace;

use crate::encoder::EncoderCounters;
use crate::error::{HwError, Result};
use crate::ultrasonic::{Alternator, echo_us_to_cm};
use crate::util::wait_for_level;

impl From<rppal::gpio::Error> for HwError {
    fn from(e: rppal::gpio::Error) -> Self {
        HwError::Gpio(e.to_string())
    }
}

impl From<rppal::spi::Error> for HwError {
    fn from(e: rppal::spi::Error) -> Self {
        HwError::Spi(e.to_string())
    }
}

#[inline(always)]
fn spin_for(d: Duration) {
    let until = Instant::now() + d;
    while Instant::now() < until {
        std::hint::spin_loop();
    }
}

struct Hcsr04 {
    trigger: OutputPin,
    echo: InputPin,
}

impl Hcsr04 {
    /// Pulse width of the echo in microseconds; 0 when no echo arrived.
    fn measure(&mut self, timeout: Duration) -> u64 {
        self.trigger.set_low();
        spin_for(Duration::from_micros(2));
        self.trigger.set_high();
        spin_for(Duration::from_micros(10));
        self.trigger.set_low();

        let echo = &self.echo;
        let Ok(rise) = wait_for_level(|| echo.is_high(), true, timeout) else {
            return 0;
        };
        match wait_for_level(|| echo.is_high(), false, timeout) {
            Ok(fall) => fall.saturating_duration_since(rise).as_micros() as u64,
            Err(_) => 0,
        }
    }
}

/// Left and right HC-SR04 sensors fired alternately, one per poll.
pub struct UltrasonicPair {
    left: Hcsr04,
    right: Hcsr04,
    alt: Alternator,
}

impl UltrasonicPair {
    pub fn new(left_trigger: u8, left_echo: u8, right_trigger: u8, right_echo: u8) -> Result<Self> {
        let gpio = Gpio::new()?;
        let make = |trig: u8, echo: u8| -> Result<Hcsr04> {
            let mut trigger = gpio.get(trig)?.into_output();
            trigger.set_low();
            let echo = gpio.get(echo)?.into_input();
            Ok(Hcsr04 { trigger, echo })
        };
        Ok(Self {
            left: make(left_trigger, left_echo)?,
            right: make(right_trigger, right_echo)?,
            alt: Alternator::default(),
        })
    }
}

impl RangeSensor for UltrasonicPair {
    fn poll(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<(Side, i32), Box<dyn std::error::Error + Send + Sync>> {
        let side = self.alt.advance();
        let sensor = match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        };
        let us = sensor.measure(timeout);
        let cm = if us == 0 { OUT_OF_RANGE } else { echo_us_to_cm(us) };
        trace!(?side, echo_us = us, cm, "hc-sr04 poll");
        Ok((side, cm))
    }
}

/// MCP3008 channel reading the line-sensor resistor ladder.
pub struct Mcp3008Line {
    spi: Spi,
    channel: u8,
}

impl Mcp3008Line {
    pub fn new(channel: u8) -> Result<Self> {
        if channel > 7 {
            return Err(HwError::Spi(format!("mcp3008 has channels 0..=7, got {channel}")));
        }
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, 1_000_000, Mode::Mode0)?;
        Ok(Self { spi, channel })
    }
}

impl LineSensor for Mcp3008Line {
    fn read_raw(&mut self) -> std::result::Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        let tx = [0x01, (0x08 | self.channel) << 4, 0x00];
        let mut rx = [0u8; 3];
        self.spi.transfer(&mut rx, &tx).map_err(HwError::from)?;
        let raw10 = (u16::from(rx[1] & 0x03) << 8) | u16::from(rx[2]);
        // Thresholds are on the 12-bit scale.
        Ok(raw10 << 2)
    }
}

const PWM_HZ: f64 = 1_000.0;

struct Channel {
    in1: OutputPin,
    in2: OutputPin,
    pwm: OutputPin,
}

/// Dual H-bridge: channel A drives the left wheel, channel B the right.
pub struct HBridge {
    ch: [Channel; 2],
}

impl HBridge {
    pub fn new(in1a: u8, in2a: u8, pwm_a: u8, in1b: u8, in2b: u8, pwm_b: u8) -> Result<Self> {
        let gpio = Gpio::new()?;
        let make = |in1: u8, in2: u8, pwm: u8| -> Result<Channel> {
            Ok(Channel {
                in1: gpio.get(in1)?.into_output_low(),
                in2: gpio.get(in2)?.into_output_low(),
                pwm: gpio.get(pwm)?.into_output_low(),
            })
        };
        Ok(Self {
            ch: [make(in1a, in2a, pwm_a)?, make(in1b, in2b, pwm_b)?],
        })
    }
}

impl DriveMotors for HBridge {
    fn set_direction(
        &mut self,
        wheel: Wheel,
        mode: DriveMode,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let c = &mut self.ch[wheel.index()];
        let (a, b) = match mode {
            DriveMode::Forward => (Level::High, Level::Low),
            DriveMode::Reverse => (Level::Low, Level::High),
            DriveMode::Brake => (Level::Low, Level::Low),
        };
        c.in1.write(a);
        c.in2.write(b);
        Ok(())
    }

    fn set_duty(
        &mut self,
        wheel: Wheel,
        duty: u8,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let pwm = &mut self.ch[wheel.index()].pwm;
        if duty == 0 {
            pwm.clear_pwm().map_err(|e| HwError::Pwm(e.to_string()))?;
            pwm.set_low();
            return Ok(());
        }
        pwm.set_pwm_frequency(PWM_HZ, f64::from(duty) / 255.0)
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        Ok(())
    }
}

/// Rising-edge interrupts feeding an [`EncoderCounters`] cell.
pub struct EncoderInputs {
    _pins: [InputPin; 2],
    counters: Arc<EncoderCounters>,
}

impl EncoderInputs {
    pub fn new(encoder_a: u8, encoder_b: u8) -> Result<Self> {
        let gpio = Gpio::new()?;
        let counters = Arc::new(EncoderCounters::new());
        let arm = |pin: u8, wheel: Wheel| -> Result<InputPin> {
            let mut input = gpio.get(pin)?.into_input_pullup();
            let cell = Arc::clone(&counters);
            input.set_async_interrupt(Trigger::RisingEdge, move |_level: Level| {
                cell.record_edge(wheel);
            })?;
            Ok(input)
        };
        let a = arm(encoder_a, Wheel::Left)?;
        let b = arm(encoder_b, Wheel::Right)?;
        Ok(Self {
            _pins: [a, b],
            counters,
        })
    }
}

impl Encoders for EncoderInputs {
    fn read_count(&self, wheel: Wheel) -> u64 {
        self.counters.read_count(wheel)
    }

    fn reset(&self) {
        self.counters.reset();
    }
}
