use crate::error::NormalizeError;
use crate::model::CostRow;

/// Concatenate the Criteo and Kelkoo tables.
///
/// Either side may be absent (nothing to report that day). Both absent is an
/// error: publishing an empty table would wipe the sheet. No re-aggregation
/// happens here; the two sources never share a key since `engine` differs.
pub fn merge(
    criteo: Option<Vec<CostRow>>,
    kelkoo: Option<Vec<CostRow>>,
) -> Result<Vec<CostRow>, NormalizeError> {
    match (criteo, kelkoo) {
        (None, None) => Err(NormalizeError::NoData),
        (Some(a), None) => Ok(a),
        (None, Some(b)) => Ok(b),
        (Some(mut a), Some(b)) => {
            a.extend(b);
            Ok(a)
        }
    }
}
