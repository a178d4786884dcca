//! Built-in syntax elements.
//!
//! Registration order is resolution order, so the more specific forms come
//! first within each kind:
//!
//! ```text
//! effects      set / add / delete {variable}
//! conditions   greater/less than -> is set -> equality
//! expressions  {variable} -> event-<kind> -> now -> parsed as date
//!              -> arithmetic -> text literal (fallback only)
//! ```
//!
//! Hosts add their own types and constructs to the same
//! [`RegistryBuilder`] after the core set; earlier registrations win
//! ambiguities.

#[path = "elements/arithmetic.rs"]
mod arithmetic;
#[path = "elements/comparison.rs"]
mod comparison;
#[path = "elements/events.rs"]
mod events;
#[path = "elements/literals.rs"]
mod literals;
#[path = "elements/time.rs"]
mod time;
#[path = "elements/variables.rs"]
mod variables;

#[cfg(test)]
#[path = "elements/tests.rs"]
mod tests;

use crate::engine::RegistryBuilder;
use crate::error::RegistryError;

pub use arithmetic::{ArithOp, Arithmetic};
pub use comparison::{Equality, IsSet, NumberOrder, PropertyCondition, register_property_condition};
pub use events::EventValue;
pub use literals::TextTemplate;
pub use time::{Now, ParseDate};
pub use variables::{ChangeVariable, Variable};

/// Register the core constructs and events.
pub fn register_core(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder.register(variables::change_variable())?;

    builder.register(comparison::number_order())?;
    builder.register(comparison::is_set())?;
    builder.register(comparison::equality())?;

    builder.register(variables::variable())?;
    builder.register(events::event_value())?;
    builder.register(time::now())?;
    builder.register(time::parse_date())?;
    builder.register(arithmetic::arithmetic())?;
    builder.register(literals::text_literal())?;

    builder.register_event("load", &["[script] (load|loading)"])?;
    builder.register_event("join", &["[player] (join|joining)"])?;
    builder.register_event("quit", &["[player] (quit|quitting|leave|leaving)"])?;
    builder.register_event("chat", &["[player] (chat|chatting)"])?;
    builder.register_event("death", &["death", "[entity] (die|dying)"])?;
    tracing::debug!(constructs = 10, "registered core elements");
    Ok(())
}
