//! Control bytes used by the RTD wire format.

/// Start of header; separates the header from the control block.
pub const SOH: u8 = 0x01;

/// Start of text; precedes the payload.
pub const STX: u8 = 0x02;

/// End of transmission; terminates the payload, included in the checksum.
pub const EOT: u8 = 0x04;

/// Synchronous idle; marks the start of a frame.
pub const SYN: u8 = 0x16;

/// End of transmission block; marks the end of a frame.
pub const ETB: u8 = 0x17;

/// Returns a human-readable name for a control byte.
pub fn marker_name(byte: u8) -> &'static str {
    match byte {
        SOH => "SOH",
        STX => "STX",
        EOT => "EOT",
        SYN => "SYN",
        ETB => "ETB",
        _ => "DATA",
    }
}

/// Returns true if `byte` delimits frames and so cannot appear inside one.
pub fn is_delimiter(byte: u8) -> bool {
    byte == SYN || byte == ETB
}
