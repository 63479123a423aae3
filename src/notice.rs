use serde::Serialize;
use strum::{AsRefStr, EnumString};

use crate::validation::ValidationError;

/// Outcome messages shown in the page's message box after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Notice {
    Submitted,
    SubmitFailed,
    EmptyLink,
    InvalidLink,
    PickedUp,
    NothingAvailable,
    PickupFailed,
    ReviewSaved,
    ReviewFailed,
    InvalidScore,
    Deleted,
    DeleteFailed,
    SettingsSaved,
    SettingsFailed,
    InvalidSettings,
    Cleared,
    ClearFailed,
    Forbidden,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoticeView {
    pub text: String,
    pub error: bool,
}

impl Notice {
    pub fn text(self) -> &'static str {
        match self {
            Notice::Submitted => "Práce byla odevzdána.",
            Notice::SubmitFailed => "Odevzdání se nezdařilo. Zkuste to prosím znovu.",
            Notice::EmptyLink => "Odkaz nesmí být prázdný.",
            Notice::InvalidLink => "Zadejte platný odkaz začínající na http.",
            Notice::PickedUp => "Byla vám přidělena práce k ohodnocení.",
            Notice::NothingAvailable => "Momentálně není k dispozici žádná práce k ohodnocení.",
            Notice::PickupFailed => "Přidělení práce se nezdařilo.",
            Notice::ReviewSaved => "Hodnocení bylo uloženo.",
            Notice::ReviewFailed => "Uložení hodnocení se nezdařilo.",
            Notice::InvalidScore => "Skóre musí být celé číslo v povoleném rozsahu.",
            Notice::Deleted => "Záznam byl smazán.",
            Notice::DeleteFailed => "Smazání se nezdařilo.",
            Notice::SettingsSaved => "Nastavení bylo uloženo.",
            Notice::SettingsFailed => "Uložení nastavení se nezdařilo.",
            Notice::InvalidSettings => {
                "Počet hodnocení musí být kladný a maximální skóre mezi 0 a 100."
            }
            Notice::Cleared => "Všechna data byla smazána.",
            Notice::ClearFailed => "Smazání dat se nezdařilo.",
            Notice::Forbidden => "K této akci nemáte oprávnění.",
        }
    }

    pub fn is_error(self) -> bool {
        !matches!(
            self,
            Notice::Submitted
                | Notice::PickedUp
                | Notice::ReviewSaved
                | Notice::Deleted
                | Notice::SettingsSaved
                | Notice::Cleared
        )
    }

    pub fn view(self) -> NoticeView {
        NoticeView {
            text: self.text().to_string(),
            error: self.is_error(),
        }
    }
}

impl From<ValidationError> for Notice {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyLink => Notice::EmptyLink,
            ValidationError::InvalidLink => Notice::InvalidLink,
            ValidationError::InvalidScore { .. } => Notice::InvalidScore,
            ValidationError::InvalidReviewCount | ValidationError::InvalidMaxScore => {
                Notice::InvalidSettings
            }
        }
    }
}
