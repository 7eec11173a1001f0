//! # Resource Quantities
//!
//! The API server stores quantities in canonical form (`1000m` comes back as
//! `1`, `0.5` as `500m`), so resource requirements are compared by value.

use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

const BINARY_SUFFIXES: [(&str, u32); 6] = [
    ("Ki", 1),
    ("Mi", 2),
    ("Gi", 3),
    ("Ti", 4),
    ("Pi", 5),
    ("Ei", 6),
];

const DECIMAL_SUFFIXES: [(&str, i32); 9] = [
    ("n", -9),
    ("u", -6),
    ("m", -3),
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
];

/// Value of a quantity in units of 10^-9, truncating anything finer
///
/// Returns `None` for strings that are not valid quantities.
pub fn nano_value(quantity: &str) -> Option<i128> {
    let quantity = quantity.trim();

    let (number, exponent, binary) = if let Some((number, power)) = BINARY_SUFFIXES
        .iter()
        .find_map(|(suffix, power)| quantity.strip_suffix(suffix).map(|n| (n, *power)))
    {
        (number, 0, power)
    } else if let Some((number, exponent)) = DECIMAL_SUFFIXES
        .iter()
        .find_map(|(suffix, exp)| quantity.strip_suffix(suffix).map(|n| (n, *exp)))
    {
        (number, exponent, 0)
    } else if let Some((number, exponent)) = quantity.split_once(['e', 'E']) {
        (number, exponent.parse::<i32>().ok()?, 0)
    } else {
        (quantity, 0, 0)
    };

    let (negative, number) = match number.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, number.strip_prefix('+').unwrap_or(number)),
    };
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let digits: i128 = format!("{whole}{fraction}").parse().ok()?;
    let scale = 9 + exponent - i32::try_from(fraction.len()).ok()?;
    let mut value = if scale >= 0 {
        digits.checked_mul(10_i128.checked_pow(scale.unsigned_abs())?)?
    } else {
        digits / 10_i128.checked_pow(scale.unsigned_abs())?
    };
    if binary > 0 {
        value = value.checked_mul(1024_i128.checked_pow(binary)?)?;
    }
    Some(if negative { -value } else { value })
}

/// Whether two quantities denote the same amount; unparseable ones compare as text
pub fn quantities_equal(a: &Quantity, b: &Quantity) -> bool {
    match (nano_value(&a.0), nano_value(&b.0)) {
        (Some(a), Some(b)) => a == b,
        _ => a.0 == b.0,
    }
}

fn quantity_maps_equal(
    a: Option<&BTreeMap<String, Quantity>>,
    b: Option<&BTreeMap<String, Quantity>>,
) -> bool {
    let empty = BTreeMap::new();
    let (a, b) = (a.unwrap_or(&empty), b.unwrap_or(&empty));
    a.len() == b.len()
        && a.iter().all(|(name, qa)| {
            b.get(name).is_some_and(|qb| quantities_equal(qa, qb))
        })
}

/// Compare resource requirements by value; `None` and `{}` are the same
pub fn resources_equal(a: Option<&ResourceRequirements>, b: Option<&ResourceRequirements>) -> bool {
    let default = ResourceRequirements::default();
    let (a, b) = (a.unwrap_or(&default), b.unwrap_or(&default));
    let claims_equal = (a.claims.as_ref().map_or(true, Vec::is_empty)
        && b.claims.as_ref().map_or(true, Vec::is_empty))
        || a.claims == b.claims;

    claims_equal
        && quantity_maps_equal(a.limits.as_ref(), b.limits.as_ref())
        && quantity_maps_equal(a.requests.as_ref(), b.requests.as_ref())
}
