use skyseat_core::error::BookingError;
use skyseat_core::ids::compare_seat_codes;
use skyseat_core::models::Seat;

/// Picks the first `requested` available seats in seat-code order.
///
/// The order is part of the contract: identical inventory always yields the
/// same seats, and competing requests try to lock overlapping seats in the
/// same sequence. Nothing is mutated here.
pub fn allocate_seats(available: &[Seat], requested: usize) -> Result<Vec<String>, BookingError> {
    let mut codes: Vec<&str> = available
        .iter()
        .filter(|seat| seat.is_available())
        .map(|seat| seat.seat_code.as_str())
        .collect();

    if codes.len() < requested {
        return Err(BookingError::SeatsUnavailable(format!(
            "{} seats requested, {} available",
            requested,
            codes.len()
        )));
    }

    codes.sort_by(|a, b| compare_seat_codes(a, b));
    Ok(codes.into_iter().take(requested).map(str::to_string).collect())
}
