use chrono::Utc;
use rand::Rng;
use std::cmp::Ordering;
use uuid::Uuid;

/// PNR alphabet without the glyphs that get misread over the phone (0/O, 1/I/L).
const PNR_CHARSET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const PNR_LENGTH: usize = 6;

/// Booking ids combine a millisecond timestamp with 8 random hex characters,
/// e.g. `BK1718031234567A1B2C3D4`.
pub fn generate_booking_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "BK{}{}",
        Utc::now().timestamp_millis(),
        random[..8].to_uppercase()
    )
}

pub fn generate_pnr() -> String {
    let mut rng = rand::thread_rng();
    (0..PNR_LENGTH)
        .map(|_| PNR_CHARSET[rng.gen_range(0..PNR_CHARSET.len())] as char)
        .collect()
}

/// Seat code for the zero-based `index` in a cabin with `seats_per_row`
/// seats per row: A1..A6, B1..B6, ..., Z6, AA1, ...
pub fn seat_code(index: usize, seats_per_row: usize) -> String {
    let per_row = seats_per_row.max(1);
    let row = index / per_row;
    let column = index % per_row + 1;
    format!("{}{}", row_letters(row), column)
}

fn row_letters(mut row: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (row % 26) as u8) as char);
        if row < 26 {
            break;
        }
        row = row / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Total order over seat codes: row letters first (shorter rows first, then
/// alphabetical), then the numeric column. `A2 < A10 < B1 < Z6 < AA1`.
pub fn compare_seat_codes(a: &str, b: &str) -> Ordering {
    let (row_a, col_a) = split_seat_code(a);
    let (row_b, col_b) = split_seat_code(b);

    row_a
        .len()
        .cmp(&row_b.len())
        .then_with(|| row_a.cmp(row_b))
        .then_with(|| col_a.cmp(&col_b))
        .then_with(|| a.cmp(b))
}

fn split_seat_code(code: &str) -> (&str, u32) {
    let split = code
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(code.len());
    let (row, column) = code.split_at(split);
    (row, column.parse().unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_code_layout() {
        assert_eq!(seat_code(0, 6), "A1");
        assert_eq!(seat_code(5, 6), "A6");
        assert_eq!(seat_code(6, 6), "B1");
        assert_eq!(seat_code(25 * 6 + 5, 6), "Z6");
        assert_eq!(seat_code(26 * 6, 6), "AA1");
        assert_eq!(seat_code(3, 0), "D1");
    }

    #[test]
    fn test_seat_code_order() {
        let mut codes = vec!["B1", "A10", "AA1", "A2", "Z6", "A1"];
        codes.sort_by(|a, b| compare_seat_codes(a, b));
        assert_eq!(codes, vec!["A1", "A2", "A10", "B1", "Z6", "AA1"]);
    }

    #[test]
    fn test_identifier_shapes() {
        let pnr = generate_pnr();
        assert_eq!(pnr.len(), PNR_LENGTH);
        assert!(pnr.bytes().all(|b| PNR_CHARSET.contains(&b)));

        let first = generate_booking_id();
        let second = generate_booking_id();
        assert!(first.starts_with("BK"));
        assert_ne!(first, second);
    }
}
