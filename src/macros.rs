//! Feature-gated iteration helpers shared by the build and query paths.
//!
//! Callers import `rayon::prelude::*` under `#[cfg(feature = "parallel")]`.

/// Conditionally parallel iterator over a range.
macro_rules! maybe_par_range {
    ($range:expr) => {{
        #[cfg(feature = "parallel")]
        {
            ($range).into_par_iter()
        }
        #[cfg(not(feature = "parallel"))]
        {
            $range
        }
    }};
}

/// Conditionally parallel iterator over a slice.
macro_rules! maybe_par_iter {
    ($slice:expr) => {{
        #[cfg(feature = "parallel")]
        {
            $slice.par_iter()
        }
        #[cfg(not(feature = "parallel"))]
        {
            $slice.iter()
        }
    }};
}
