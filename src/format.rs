//! Presentation helpers shared by the JSON views: money and date formatting,
//! slugs, storage image URLs, contact validation and the label/badge tables
//! for the schema enums.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::str::FromStr;

use crate::models::{BookingStatus, PackageTier, UserRole};

pub const DEFAULT_CURRENCY: &str = "EUR";
pub const DEFAULT_IMAGES_BUCKET: &str = "villa-images";
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-villa.jpg";

// French typography: U+202F between digit groups, U+00A0 before the symbol.
const GROUP_SEPARATOR: char = '\u{202F}';
const SYMBOL_SEPARATOR: char = '\u{00A0}';

const NEUTRAL_BADGE: &str = "bg-gray-100 text-gray-800";
const OWNER_LABEL: &str = "Propriétaire";

// --- Locale ---

/// Locale
///
/// Languages the views are rendered in. French is the house default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    FrFr,
    EnUs,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let language = tag.split(['-', '_']).next().unwrap_or_default();
        match language.to_ascii_lowercase().as_str() {
            "fr" => Ok(Locale::FrFr),
            "en" => Ok(Locale::EnUs),
            _ => Err(format!("unsupported locale: {tag}")),
        }
    }
}

const FR_MONTHS: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
    "octobre", "novembre", "décembre",
];
const FR_MONTHS_SHORT: [&str; 12] = [
    "janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.", "nov.",
    "déc.",
];
const EN_MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];
const EN_MONTHS_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// --- Money ---

/// format_currency
///
/// Formats an amount the way a French price tag reads: `1 234,56 €`.
/// Currencies without minor units (JPY, KRW, ...) are rounded to whole units.
pub fn format_currency(amount: f64, currency: &str) -> String {
    let code = currency.to_ascii_uppercase();
    let digits = minor_digits(&code);
    let scale = 10_i64.pow(digits);
    let scaled = (amount.abs() * scale as f64).round() as i64;

    let mut out = String::new();
    if amount.is_sign_negative() && scaled != 0 {
        out.push('-');
    }
    out.push_str(&group_thousands(scaled / scale));
    if digits > 0 {
        out.push(',');
        out.push_str(&format!("{:0width$}", scaled % scale, width = digits as usize));
    }
    out.push(SYMBOL_SEPARATOR);
    out.push_str(currency_symbol(&code));
    out
}

fn minor_digits(code: &str) -> u32 {
    match code {
        "JPY" | "KRW" | "XPF" | "XOF" | "XAF" | "CLP" | "ISK" | "VND" => 0,
        _ => 2,
    }
}

fn currency_symbol(code: &str) -> &str {
    match code {
        "EUR" => "€",
        "USD" => "$US",
        "GBP" => "£GB",
        "CAD" => "$CA",
        "XPF" => "FCFP",
        other => other,
    }
}

fn group_thousands(units: i64) -> String {
    let digits = units.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(ch);
    }
    out
}

// --- Dates ---

/// format_date
///
/// Long date: `15 janvier 2024` / `January 15, 2024`.
pub fn format_date(date: NaiveDate, locale: Locale) -> String {
    let month = date.month0() as usize;
    match locale {
        Locale::FrFr => format!("{} {} {}", date.day(), FR_MONTHS[month], date.year()),
        Locale::EnUs => format!("{} {}, {}", EN_MONTHS[month], date.day(), date.year()),
    }
}

/// format_date_range
///
/// Compact stay label; only the end date carries the year:
/// `15 janv. - 20 janv. 2024` / `Jan 15 - Jan 20, 2024`.
pub fn format_date_range(start: NaiveDate, end: NaiveDate, locale: Locale) -> String {
    let (start_label, end_label) = match locale {
        Locale::FrFr => (
            format!("{} {}", start.day(), FR_MONTHS_SHORT[start.month0() as usize]),
            format!(
                "{} {} {}",
                end.day(),
                FR_MONTHS_SHORT[end.month0() as usize],
                end.year()
            ),
        ),
        Locale::EnUs => (
            format!("{} {}", EN_MONTHS_SHORT[start.month0() as usize], start.day()),
            format!(
                "{} {}, {}",
                EN_MONTHS_SHORT[end.month0() as usize],
                end.day(),
                end.year()
            ),
        ),
    };
    format!("{start_label} - {end_label}")
}

/// Whole days between two dates, regardless of order.
pub fn calculate_days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().abs()
}

/// Every day of a stay: `start` inclusive, `end` (departure) exclusive.
pub fn generate_date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|day| *day < end).collect()
}

/// Inclusive on both ends.
pub fn is_date_in_range(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    date >= start && date <= end
}

// --- Text & URLs ---

/// slugify
///
/// URL slug: lowercase, whitespace runs become `-`, anything outside
/// `[a-z0-9_-]` is dropped, repeated dashes collapse and edge dashes go.
/// Accented letters are dropped rather than transliterated.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    for ch in lowered.trim().chars() {
        let mapped = if ch.is_whitespace() {
            '-'
        } else if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            ch
        } else {
            continue;
        };
        if mapped == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(mapped);
    }
    slug.trim_matches('-').to_string()
}

/// image_url
///
/// Resolves a villa image reference. Absolute URLs pass through; storage
/// paths become public object URLs when the Supabase URL is known.
pub fn image_url(path: &str, bucket: &str, supabase_url: Option<&str>) -> String {
    if path.is_empty() {
        return PLACEHOLDER_IMAGE.to_string();
    }
    if path.starts_with("http") {
        return path.to_string();
    }
    match supabase_url {
        Some(base) => format!(
            "{}/storage/v1/object/public/{}/{}",
            base.trim_end_matches('/'),
            bucket,
            path
        ),
        None => path.to_string(),
    }
}

// --- Validation ---

pub fn validate_email(email: &str) -> bool {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").is_ok_and(|re| re.is_match(email))
}

/// French phone numbers: `0X XX XX XX XX`, `+33 X ...` or `0033 X ...`, with
/// optional `.`/`-` separators. Whitespace is ignored.
pub fn validate_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    Regex::new(r"^(?:(?:\+|00)33|0)\s*[1-9](?:[\s.\-]*[0-9]{2}){4}$")
        .is_ok_and(|re| re.is_match(&compact))
}

// --- Label & Badge Tables ---

impl BookingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "En attente",
            BookingStatus::Confirmed => "Confirmé",
            BookingStatus::Cancelled => "Annulé",
            BookingStatus::Completed => "Terminé",
        }
    }

    pub fn badge_classes(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "bg-yellow-100 text-yellow-800",
            BookingStatus::Confirmed => "bg-green-100 text-green-800",
            BookingStatus::Cancelled => "bg-red-100 text-red-800",
            BookingStatus::Completed => "bg-blue-100 text-blue-800",
        }
    }
}

impl PackageTier {
    pub fn label(&self) -> &'static str {
        match self {
            PackageTier::Basic => "Basique",
            PackageTier::Premium => "Premium",
            PackageTier::Luxury => "Luxe",
        }
    }

    pub fn badge_classes(&self) -> &'static str {
        match self {
            PackageTier::Basic => NEUTRAL_BADGE,
            PackageTier::Premium => "bg-blue-100 text-blue-800",
            PackageTier::Luxury => "bg-purple-100 text-purple-800",
        }
    }
}

impl UserRole {
    pub fn label(&self) -> &'static str {
        match self {
            UserRole::Customer => "Client",
            UserRole::Admin => "Administrateur",
        }
    }
}

// Lookups for raw strings coming from outside the typed schema (query
// parameters, legacy rows). Unknown values fall back to the input itself for
// labels and to the neutral badge for colors.

pub fn booking_status_label(raw: &str) -> String {
    raw.parse::<BookingStatus>()
        .map(|status| status.label().to_string())
        .unwrap_or_else(|_| raw.to_string())
}

pub fn booking_status_classes(raw: &str) -> &'static str {
    raw.parse::<BookingStatus>()
        .map(|status| status.badge_classes())
        .unwrap_or(NEUTRAL_BADGE)
}

pub fn package_tier_label(raw: &str) -> String {
    raw.parse::<PackageTier>()
        .map(|tier| tier.label().to_string())
        .unwrap_or_else(|_| raw.to_string())
}

pub fn package_tier_classes(raw: &str) -> &'static str {
    raw.parse::<PackageTier>()
        .map(|tier| tier.badge_classes())
        .unwrap_or(NEUTRAL_BADGE)
}

/// Accepts roles outside the schema enum too, such as the legacy `owner`.
pub fn user_role_label(raw: &str) -> String {
    if raw == "owner" {
        return OWNER_LABEL.to_string();
    }
    raw.parse::<UserRole>()
        .map(|role| role.label().to_string())
        .unwrap_or_else(|_| raw.to_string())
}
