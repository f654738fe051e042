use crate::reminder::{ReminderKind, ReminderPayload};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Locale {
    En,
    Ar,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" => Ok(Self::En),
            "ar" => Ok(Self::Ar),
            other => Err(format!("Unsupported locale: {}", other)),
        }
    }
}

fn or_placeholder(value: &Option<String>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v.as_str(),
        _ => PLACEHOLDER,
    }
}

fn format_amount(payload: &ReminderPayload) -> String {
    match payload.amount {
        Some(amount) => format!("{:.2} {}", amount, payload.currency),
        None => PLACEHOLDER.to_string(),
    }
}

/// Renders the message body of a reminder from the context captured in its
/// payload. Missing property or unit context renders as a placeholder.
pub fn render_message(
    kind: ReminderKind,
    locale: Locale,
    payload: &ReminderPayload,
    offset_days: i64,
) -> String {
    let property = or_placeholder(&payload.property_name);
    let unit = or_placeholder(&payload.unit_number);
    let reference = or_placeholder(&payload.reference);
    let date = payload.obligation_date.format("%d/%m/%Y");

    match (kind, locale) {
        (ReminderKind::PaymentReminder, Locale::En) => format!(
            "Dear {}, this is a reminder that your rent payment of {} for {} unit {} is due on {} (in {} {}). Reference: {}.",
            payload.client_name,
            format_amount(payload),
            property,
            unit,
            date,
            offset_days,
            if offset_days == 1 { "day" } else { "days" },
            reference
        ),
        (ReminderKind::PaymentReminder, Locale::Ar) => format!(
            "عزيزي {}، نذكركم بأن دفعة الإيجار بقيمة {} للعقار {} الوحدة {} مستحقة بتاريخ {} (بعد {} يوم). المرجع: {}.",
            payload.client_name,
            format_amount(payload),
            property,
            unit,
            date,
            offset_days,
            reference
        ),
        (ReminderKind::ContractExpiryReminder, Locale::En) => format!(
            "Dear {}, your lease contract {} for {} unit {} expires on {} (in {} {}). Please contact us to arrange a renewal.",
            payload.client_name,
            reference,
            property,
            unit,
            date,
            offset_days,
            if offset_days == 1 { "day" } else { "days" }
        ),
        (ReminderKind::ContractExpiryReminder, Locale::Ar) => format!(
            "عزيزي {}، ينتهي عقد الإيجار رقم {} للعقار {} الوحدة {} بتاريخ {} (بعد {} يوم). يرجى التواصل معنا لترتيب التجديد.",
            payload.client_name,
            reference,
            property,
            unit,
            date,
            offset_days
        ),
    }
}
