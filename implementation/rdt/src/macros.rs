/// Asserts that the given datagram is at least `$size` bytes long and
/// otherwise returns `DecodeError::Truncated`.
macro_rules! assert_size {
    ($buf:expr, $size:expr) => {{
        if $buf.len() < $size {
            return Err(crate::segment::DecodeError::Truncated {
                needed: $size,
                actual: $buf.len(),
            });
        }
    }};
}
