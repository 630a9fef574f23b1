//! Stand-in collaborators for robots built without every sensor.

/// Line sensor for robots without a line ladder: always reads level 0,
/// which decodes to `0000 NO_LINE`.
pub struct NoLineSensor;

impl sumo_traits::LineSensor for NoLineSensor {
    fn read_raw(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        Ok(0)
    }
}
