//! Rupee amounts rendered as English words in the Indian numbering system
//! (crore / lakh / thousand / hundred).

const ONES: [&str; 10] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine",
];

const TEENS: [&str; 10] = [
    "Ten",
    "Eleven",
    "Twelve",
    "Thirteen",
    "Fourteen",
    "Fifteen",
    "Sixteen",
    "Seventeen",
    "Eighteen",
    "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

const CRORE: u64 = 10_000_000;
const LAKH: u64 = 100_000;
const THOUSAND: u64 = 1_000;
const HUNDRED: u64 = 100;

/// Render a whole-rupee amount as English words using Indian grouping.
///
/// `0` maps to `"Zero"`. Supported up to 999,999,999,999 (the crore group is
/// itself expanded with lakh/thousand grouping); larger values are outside the
/// documented range of the legal amount-in-words field.
pub fn rupees_in_words(amount: u64) -> String {
    if amount == 0 {
        return "Zero".to_string();
    }

    let mut out = String::new();
    let crore = amount / CRORE;
    if crore > 0 {
        out.push_str(&segment_words(crore));
        out.push_str(" Crore ");
    }
    out.push_str(&segment_words(amount % CRORE));
    out.trim().to_string()
}

/// Words for a value below one crore: lakh, thousand, hundred groups, then a
/// two-digit remainder. Each non-zero group contributes `<words> <name> `.
fn segment_words(n: u64) -> String {
    let mut out = String::new();

    let lakh = n / LAKH;
    if lakh > 0 {
        out.push_str(&two_digit_words(lakh));
        out.push_str(" Lakh ");
    }

    let thousand = (n % LAKH) / THOUSAND;
    if thousand > 0 {
        out.push_str(&two_digit_words(thousand));
        out.push_str(" Thousand ");
    }

    let hundred = (n % THOUSAND) / HUNDRED;
    if hundred > 0 {
        out.push_str(ONES[hundred as usize]);
        out.push_str(" Hundred ");
    }

    let rest = n % HUNDRED;
    if rest > 0 {
        out.push_str(&two_digit_words(rest));
    }

    out.trim_end().to_string()
}

fn two_digit_words(n: u64) -> String {
    debug_assert!(n < 100);
    match n {
        0 => String::new(),
        1..=9 => ONES[n as usize].to_string(),
        10..=19 => TEENS[(n - 10) as usize].to_string(),
        _ => {
            let tens = TENS[(n / 10) as usize];
            let ones = ONES[(n % 10) as usize];
            if ones.is_empty() {
                tens.to_string()
            } else {
                format!("{} {}", tens, ones)
            }
        }
    }
}
