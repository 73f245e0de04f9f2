//! Flag sets carried by parse nodes.

bitflags::bitflags! {
    /// Flags on every parse node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u8 {
        const NONE     = 0;
        /// The node starts a new source line (a coverage and stepping point).
        const NEWLINE  = 1 << 0;
        /// The node was inserted by the parser rather than written by the user,
        /// e.g. the nil standing in for an empty body.
        const IMPLICIT = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Regexp literal options, `/.../imxo` and the encoding letters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RegexpOptions: u16 {
        const NONE        = 0;
        const IGNORECASE  = 1 << 0;
        const EXTENDED    = 1 << 1;
        const MULTILINE   = 1 << 2;
        /// `o`: interpolate only once, on first evaluation.
        const ONCE        = 1 << 3;
        /// `n`: ASCII-8BIT.
        const NO_ENCODING = 1 << 4;
        const EUC         = 1 << 5;
        const SJIS        = 1 << 6;
        const UTF8        = 1 << 7;
    }
}

impl RegexpOptions {
    /// The option letters as they would be written after the closing slash.
    pub fn to_flag_string(self) -> String {
        let mut out = String::new();
        for (flag, letter) in [
            (RegexpOptions::MULTILINE, 'm'),
            (RegexpOptions::IGNORECASE, 'i'),
            (RegexpOptions::EXTENDED, 'x'),
            (RegexpOptions::ONCE, 'o'),
            (RegexpOptions::NO_ENCODING, 'n'),
            (RegexpOptions::EUC, 'e'),
            (RegexpOptions::SJIS, 's'),
            (RegexpOptions::UTF8, 'u'),
        ] {
            if self.contains(flag) {
                out.push(letter);
            }
        }
        out
    }

    /// The options that survive into the compiled regexp. `o` only affects
    /// how the literal is evaluated.
    pub fn without_once(self) -> RegexpOptions {
        self - RegexpOptions::ONCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_string() {
        let opts = RegexpOptions::IGNORECASE | RegexpOptions::MULTILINE | RegexpOptions::ONCE;
        assert_eq!(opts.to_flag_string(), "mio");
        assert_eq!(opts.without_once().to_flag_string(), "mi");
        assert_eq!(RegexpOptions::NONE.to_flag_string(), "");
    }
}
