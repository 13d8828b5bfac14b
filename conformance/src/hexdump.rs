use std::fmt::Write;

/// Classic 16-bytes-per-row hex dump with an ASCII gutter.
pub fn hexdump(data: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in data.chunks(16).enumerate() {
        let _ = write!(out, "{:08x}  ", i * 16);

        for (j, byte) in chunk.iter().enumerate() {
            let _ = write!(out, "{byte:02x} ");
            if j == 7 {
                out.push(' ');
            }
        }

        // Pad short rows so the gutter lines up.
        for j in chunk.len()..16 {
            out.push_str("   ");
            if j == 7 {
                out.push(' ');
            }
        }

        out.push_str(" |");
        out.extend(chunk.iter().map(|&b| {
            if (0x20..0x7f).contains(&b) {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }
    out
}
