/*
 * Responsibility
 * - v1 request/response DTOs (re-export)
 * - Shared validation helpers for hand-rolled validate() methods
 */
pub mod brand_features;

/// Cross-field rule: two optional fields must be provided together or not
/// at all. Violations name both fields so the client can fix the payload.
pub(crate) fn require_paired(
    field_a: &str,
    a_present: bool,
    field_b: &str,
    b_present: bool,
) -> Result<(), String> {
    if a_present != b_present {
        return Err(format!(
            "{field_a} and {field_b} must both be set or both be absent"
        ));
    }
    Ok(())
}
