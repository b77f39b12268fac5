//! Volume and envelope conversion tables of the DS sound driver

/// Logarithmic attenuation for volume indices 0-127
#[rustfmt::skip]
const SCALE_TABLE: [i16; 128] = [
    -32768, -421, -361, -325, -300, -281, -265, -252,
    -240, -230, -221, -212, -205, -198, -192, -186,
    -180, -175, -170, -165, -161, -156, -152, -148,
    -145, -141, -138, -134, -131, -128, -125, -122,
    -120, -117, -114, -112, -110, -107, -105, -103,
    -100, -98, -96, -94, -92, -90, -88, -86,
    -85, -83, -81, -79, -78, -76, -74, -73,
    -71, -70, -68, -67, -65, -64, -62, -61,
    -60, -58, -57, -56, -54, -53, -52, -51,
    -49, -48, -47, -46, -45, -43, -42, -41,
    -40, -39, -38, -37, -36, -35, -34, -33,
    -32, -31, -30, -29, -28, -27, -26, -25,
    -24, -23, -23, -22, -21, -20, -19, -18,
    -17, -17, -16, -15, -14, -13, -12, -12,
    -11, -10, -9, -9, -8, -7, -6, -6,
    -5, -4, -3, -3, -2, -1, -1, 0,
];

/// Attack multipliers for the fastest attack values (0x6D-0x7F)
const ATTACK_TABLE: [u8; 19] = [
    0x00, 0x01, 0x05, 0x0E, 0x1A, 0x26, 0x33, 0x3F, 0x49, 0x54, 0x5C, 0x64, 0x6D, 0x74, 0x7B,
    0x7F, 0x84, 0x89, 0x8F,
];

/// Clamp a 7-bit parameter; values with the high bit set count as 0x7F
fn clamp7(value: u8) -> usize {
    if value & 0x80 != 0 {
        0x7F
    } else {
        value as usize
    }
}

/// Convert a volume index to attenuation in [-32768, 0]
pub fn cnv_scale(scale: u8) -> i32 {
    SCALE_TABLE[clamp7(scale)] as i32
}

/// Convert an attack value to the per-tick amplitude multiplier (out of 256)
pub fn cnv_attack(attack: u8) -> i32 {
    let attack = clamp7(attack);
    if attack >= 0x6D {
        ATTACK_TABLE[0x7F - attack] as i32
    } else {
        0xFF - attack as i32
    }
}

/// Convert a decay/release value to the per-tick amplitude fall rate
pub fn cnv_fall(fall: u8) -> i32 {
    match clamp7(fall) {
        0x7F => 0xFFFF,
        0x7E => 0x3C00,
        f if f < 0x32 => ((f << 1) + 1) as i32,
        f => (0x1E00 / (0x7E - f)) as i32,
    }
}

/// Convert a sustain value to its amplitude level (same curve as volume)
pub fn cnv_sustain(sustain: u8) -> i32 {
    cnv_scale(sustain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_range() {
        for i in 0..=255u8 {
            let v = cnv_scale(i);
            assert!((-32768..=0).contains(&v), "scale({}) = {}", i, v);
        }
    }

    #[test]
    fn test_high_bit_maps_to_max() {
        for i in 0x80..=0xFFu8 {
            assert_eq!(cnv_scale(i), cnv_scale(0x7F));
        }
        assert_eq!(cnv_scale(0x7F), 0);
        assert_eq!(cnv_scale(0), -32768);
        assert_eq!(cnv_scale(64), -60);
    }

    #[test]
    fn test_scale_is_monotonic() {
        for i in 1..=127u8 {
            assert!(cnv_scale(i) >= cnv_scale(i - 1));
        }
    }

    #[test]
    fn test_attack_and_fall() {
        assert_eq!(cnv_attack(0x7F), 0);
        assert_eq!(cnv_attack(0x6D), 0x8F);
        assert_eq!(cnv_attack(0), 0xFF);
        assert_eq!(cnv_fall(0x7F), 0xFFFF);
        assert_eq!(cnv_fall(0x7E), 0x3C00);
        assert_eq!(cnv_fall(10), 21);
        assert_eq!(cnv_fall(100), 0x1E00 / 26);
        assert_eq!(cnv_fall(0xFF), 0xFFFF);
    }
}
