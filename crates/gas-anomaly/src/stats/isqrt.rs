//! Integer square root over arbitrary precision integers

use malachite::Integer;

use crate::error::{EngineError, Result};

/// Floor of the square root of `n`
///
/// Newton-Raphson on integers starting from a guess of 1. Iteration stops once
/// an iterate stops decreasing, which also covers the case where integer Newton
/// oscillates between two adjacent values.
///
/// # Errors
/// * `EngineError::InvalidArgument` if `n` is negative
pub fn isqrt(n: &Integer) -> Result<Integer> {
    let zero = Integer::from(0);
    let one = Integer::from(1);
    let two = Integer::from(2);

    if *n < zero {
        return Err(EngineError::InvalidArgument(format!(
            "square root of negative number {} is not supported",
            n
        )));
    }
    if *n < two {
        return Ok(n.clone());
    }

    let mut x0 = one.clone();
    loop {
        let x1 = (n / &x0 + &x0) / &two;
        if x1 == x0 || x1 == &x0 + &one {
            break;
        }
        x0 = x1;
    }

    // The first step up from 1 can stop one short of the root (n = 4)
    let next = &x0 + &one;
    if &next * &next <= *n {
        x0 = next;
    }

    Ok(x0)
}
