//! Four-character code and status code formatting.

/// Returns true when all four bytes of `code` are printable ASCII.
#[inline]
pub fn is_printable_fourcc(code: u32) -> bool {
    code.to_be_bytes().iter().all(|b| (0x20..=0x7E).contains(b))
}

/// Formats `code` as `'abcd'` when printable, otherwise as `0x%08x`.
pub fn fourcc_string(code: u32) -> String {
    if is_printable_fourcc(code) {
        quoted(code)
    } else {
        format!("0x{code:08x}")
    }
}

/// Formats a status code as a four-character code when printable, in decimal
/// when it lies within (-200000, 200000), otherwise in hexadecimal.
pub fn osstatus_string(status: i32) -> String {
    let code = status as u32;
    if is_printable_fourcc(code) {
        quoted(code)
    } else if status > -200_000 && status < 200_000 {
        status.to_string()
    } else {
        format!("0x{code:08x}")
    }
}

fn quoted(code: u32) -> String {
    let bytes = code.to_be_bytes();
    let mut s = String::with_capacity(6);
    s.push('\'');
    bytes.iter().for_each(|&b| s.push(b as char));
    s.push('\'');
    s
}

/// Packs a four byte code into its big-endian `u32` value.
#[inline]
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_codes_are_quoted() {
        assert_eq!(fourcc_string(fourcc(b"lpcm")), "'lpcm'");
        assert_eq!(fourcc_string(fourcc(b"aac ")), "'aac '");
        assert_eq!(fourcc_string(fourcc(b".mp3")), "'.mp3'");
    }

    #[test]
    fn unprintable_codes_are_hex() {
        assert_eq!(fourcc_string(0x29), "0x00000029");
        assert_eq!(fourcc_string(0xFFFF_FFFF), "0xffffffff");
    }

    #[test]
    fn status_strings() {
        assert_eq!(osstatus_string(0), "0");
        assert_eq!(osstatus_string(-50), "-50");
        assert_eq!(osstatus_string(fourcc(b"who?") as i32), "'who?'");
        assert_eq!(osstatus_string(200_000), "0x00030d40");
        assert_eq!(osstatus_string(-200_000), "0xfffcf2c0");
    }
}
