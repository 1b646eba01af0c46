//! Worldspace sanitization for bulk-loaded objects.
//!
//! A worldspace is `[grid, [x, y, z]]`. Positions left outside the playable
//! area by old map versions are cleared so the game respawns the object at
//! a valid location.

use hive_sqf::Value;

use crate::config::WorldBounds;

/// Clear the position of an out-of-bounds worldspace in place.
///
/// Returns the original position when it was cleared. A worldspace of any
/// other shape, or with non-numeric coordinates, is left untouched.
pub fn fix_out_of_bounds(worldspace: &mut Value, bounds: WorldBounds) -> Option<Value> {
    let Ok([_, position]) = <&mut [Value; 2]>::try_from(worldspace.as_array_mut().ok()?.as_mut_slice()) else {
        return None;
    };

    let coords = position.as_array().ok()?;
    let [x, y, z] = coords else {
        return None;
    };
    let (x, y, _) = (x.as_double().ok()?, y.as_double().ok()?, z.as_double().ok()?);

    if x < bounds.max_x || y > bounds.max_y {
        Some(std::mem::replace(position, Value::empty_array()))
    } else {
        None
    }
}
