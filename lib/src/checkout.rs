//! Checkout table — known three-dart finishes for 100..=170.
//!
//! Advisory only. Validation and scoring never consult it; hosts use it to
//! suggest a finish to the player.

/// Three dart labels in throwing order (parseable as `Throw`).
pub type Finish = [&'static str; 3];

/// Sorted descending by remaining score. Sparse: bogey numbers and a few
/// awkward scores have no entry.
const FINISHES: &[(u32, Finish)] = &[
    (170, ["T20", "T20", "Bull"]),
    (167, ["T20", "T19", "Bull"]),
    (164, ["T20", "T18", "Bull"]),
    (161, ["T20", "T17", "Bull"]),
    (160, ["T20", "T20", "D20"]),
    (158, ["T20", "T20", "D19"]),
    (157, ["T20", "T19", "D20"]),
    (156, ["T20", "T20", "D18"]),
    (155, ["T20", "T19", "D19"]),
    (154, ["T20", "T18", "D20"]),
    (153, ["T20", "T19", "D18"]),
    (152, ["T20", "T20", "D16"]),
    (151, ["T20", "T17", "D20"]),
    (150, ["T20", "T18", "D18"]),
    (149, ["T20", "T19", "D16"]),
    (148, ["T20", "T20", "D14"]),
    (147, ["T20", "T17", "D18"]),
    (146, ["T20", "T18", "D16"]),
    (145, ["T20", "T19", "D14"]),
    (144, ["T20", "T20", "D12"]),
    (143, ["T20", "T17", "D16"]),
    (142, ["T20", "T18", "D14"]),
    (141, ["T20", "T19", "D12"]),
    (140, ["T20", "T20", "D10"]),
    (139, ["T20", "T13", "D20"]),
    (138, ["T20", "T18", "D12"]),
    (137, ["T20", "T19", "D10"]),
    (136, ["T20", "T20", "D8"]),
    (135, ["T20", "T17", "D12"]),
    (134, ["T20", "T18", "D10"]),
    (133, ["T20", "T19", "D8"]),
    (132, ["T20", "T20", "D6"]),
    (131, ["T20", "T13", "D16"]),
    (130, ["T20", "T18", "D8"]),
    (129, ["T20", "T19", "D6"]),
    (128, ["T20", "T20", "D4"]),
    (127, ["T20", "T17", "D8"]),
    (126, ["T20", "T18", "D6"]),
    (125, ["T20", "T19", "D4"]),
    (124, ["T20", "T20", "D2"]),
    (123, ["T20", "T13", "D12"]),
    (122, ["T20", "T18", "D4"]),
    (121, ["T20", "T19", "D2"]),
    (120, ["T20", "S20", "D20"]),
    (119, ["T20", "T19", "D1"]),
    (118, ["T20", "T18", "D2"]),
    (117, ["T20", "T17", "D3"]),
    (116, ["T20", "T16", "D4"]),
    (115, ["T20", "T15", "D5"]),
    (114, ["T20", "T14", "D6"]),
    (113, ["T20", "T13", "D7"]),
    (112, ["T20", "T12", "D8"]),
    (111, ["T20", "T11", "D9"]),
    (110, ["T20", "T10", "D10"]),
    (109, ["T20", "T9", "D11"]),
    (108, ["T20", "T8", "D12"]),
    (107, ["T20", "T7", "D13"]),
    (106, ["T20", "T6", "D14"]),
    (105, ["T20", "T5", "D15"]),
    (104, ["T20", "T4", "D16"]),
    (103, ["T20", "T3", "D17"]),
    (102, ["T20", "T2", "D18"]),
    (101, ["T20", "T1", "D19"]),
    (100, ["T20", "S20", "D10"]),
];

/// Look up the suggested finish for a remaining score.
pub fn lookup(score: u32) -> Option<&'static Finish> {
    FINISHES
        .binary_search_by(|(key, _)| score.cmp(key))
        .ok()
        .map(|i| &FINISHES[i].1)
}

/// Every remaining score that has a suggested finish, highest first.
pub fn scores() -> impl Iterator<Item = u32> {
    FINISHES.iter().map(|(score, _)| *score)
}
