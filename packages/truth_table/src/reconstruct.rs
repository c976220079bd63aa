use crate::{compiler::PositionMap, error::StructuralError};

/// Redraws an evaluated postfix trace at the columns its tokens occupied in
/// the infix text. Columns without a token (parentheses, whitespace) stay
/// blank.
pub fn reconstruct_infix(
    positions: &PositionMap,
    trace: &str,
    map_size: usize,
) -> Result<String, StructuralError> {
    let mut seen = vec![false; map_size];

    for (position, index) in positions.iter().enumerate() {
        let Some(index) = index else {
            continue;
        };

        if index >= map_size {
            return Err(StructuralError::OutOfBounds {
                index,
                position,
                size: map_size,
            });
        }
        if seen[index] {
            return Err(StructuralError::DuplicateIndex { index, position });
        }
        seen[index] = true;
    }

    let trace = trace.as_bytes();
    let mut infix = vec![b' '; map_size];

    for (position, index) in positions.iter().enumerate() {
        if let Some(index) = index {
            infix[index] = *trace
                .get(position)
                .ok_or(StructuralError::TraceTooShort { position })?;
        }
    }

    Ok(infix.into_iter().map(char::from).collect())
}
