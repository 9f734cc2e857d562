/// The condition field occupying bits 31:28 of every ARM-state opcode.
///
/// Each encoding names a predicate over the N/Z/C/V flags; the instruction
/// retires as a no-op when the predicate fails. The sixteen encodings come in
/// complementary pairs: an odd value tests the negation of the even value
/// below it, which is how `Psr::can_execute` evaluates them.
///
/// | Code | Pair      | Even-encoding predicate       |
/// |------|-----------|-------------------------------|
/// | 0/1  | EQ / NE   | Z                             |
/// | 2/3  | CS / CC   | C                             |
/// | 4/5  | MI / PL   | N                             |
/// | 6/7  | VS / VC   | V                             |
/// | 8/9  | HI / LS   | C and not Z                   |
/// | A/B  | GE / LT   | N = V                         |
/// | C/D  | GT / LE   | not Z, and N = V              |
/// | E/F  | AL / NV   | always (NV is reserved)       |
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum Condition {
    EQ = 0x0,
    NE = 0x1,
    CS = 0x2,
    CC = 0x3,
    MI = 0x4,
    PL = 0x5,
    VS = 0x6,
    VC = 0x7,
    HI = 0x8,
    LS = 0x9,
    GE = 0xA,
    LT = 0xB,
    GT = 0xC,
    LE = 0xD,
    AL = 0xE,
    NV = 0xF,
}

impl From<u8> for Condition {
    fn from(value: u8) -> Self {
        use Condition::{AL, CC, CS, EQ, GE, GT, HI, LE, LS, LT, MI, NE, NV, PL, VC, VS};
        const DECODE: [Condition; 16] = [
            EQ, NE, CS, CC, MI, PL, VS, VC, HI, LS, GE, LT, GT, LE, AL, NV,
        ];
        DECODE[usize::from(value & 0xF)]
    }
}
