//! Thing types matching the virtual drivers.

use thinghub_domain::attribute::{Attribute, AttributeValue, Changes, Kind, canonical_purpose};
use thinghub_domain::error::ValidationError;
use thinghub_domain::model::ThingType;
use thinghub_domain::thing::StateSnapshot;

/// Dimmable light: `on` and `brightness` (0–100 %).
///
/// Dimming a light that is off without saying anything about `on`
/// switches it on in the same batch.
///
/// # Errors
///
/// Never fails in practice; the builder's error is propagated.
pub fn light() -> Result<ThingType, ValidationError> {
    ThingType::builder("light")
        .name("Virtual light")
        .description("Simulated dimmable light")
        .help("Set :on to switch, :brightness (0-100) to dim")
        .with_attribute(Attribute::builder("on", Kind::Boolean).purpose(":on"))
        .with_attribute(
            Attribute::builder("brightness", Kind::Number)
                .purpose(":brightness")
                .minimum(0.0)
                .maximum(100.0)
                .unit("%"),
        )
        .validator(switch_on_when_dimmed)
        .build()
}

/// Read-only temperature sensor in °C.
///
/// # Errors
///
/// Never fails in practice; the builder's error is propagated.
pub fn temperature_sensor() -> Result<ThingType, ValidationError> {
    ThingType::builder("temperature-sensor")
        .name("Virtual temperature sensor")
        .description("Simulated room thermometer")
        .with_attribute(
            Attribute::builder("temperature", Kind::Number)
                .purpose(":temperature")
                .reading()
                .unit("\u{b0}C"),
        )
        .build()
}

/// Whether `key` names the attribute by code or by its same-named purpose.
fn addresses(key: &str, code: &str) -> bool {
    canonical_purpose(key) == canonical_purpose(code)
}

fn switch_on_when_dimmed(batch: &mut Changes, state: &StateSnapshot) -> Result<(), ValidationError> {
    if batch.iter().any(|(key, _)| addresses(key, "on")) {
        return Ok(());
    }
    let dimmed_up = batch.iter().any(|(key, value)| {
        addresses(key, "brightness") && value.as_f64().is_some_and(|level| level > 0.0)
    });
    let is_on = state.get("on").is_some_and(AttributeValue::is_truthy);
    if dimmed_up && !is_on {
        batch.push(("on".to_string(), AttributeValue::Bool(true)));
    }
    Ok(())
}
