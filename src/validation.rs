use crate::store::RosterError;

pub fn validate_required_text(field: &'static str, value: &str) -> Result<(), RosterError> {
    if value.trim().is_empty() {
        Err(RosterError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}
