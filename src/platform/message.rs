//! Notification texts.

use chrono::Duration;

use crate::core::Timestamp;

/// Platform mention syntax for a member.
pub fn mention(member: &str) -> String {
    format!("<@{}>", member)
}

/// Offer posted while a treatment window is open.
pub fn treatment_offer(member: &str, lifetime: Duration, symbol: &str) -> String {
    format!(
        "{} 💊 **Tratamento disponível agora!**\n⏳ Você tem **{} minutos**. Reaja com {} para começar.",
        mention(member),
        lifetime.num_minutes(),
        symbol
    )
}

/// Confirmation after a member accepts treatment.
pub fn treatment_started(member: &str, cured_at: Timestamp) -> String {
    format!(
        "{} 💉 **Tratamento iniciado.** Alta prevista às **{}**.",
        mention(member),
        cured_at.format("%H:%M")
    )
}

/// Treatment ran its course.
pub fn cured(member: &str) -> String {
    format!("{} ✅ **Curado(a)!** A infecção foi eliminada.", mention(member))
}

/// Deadline passed without treatment.
pub fn chronic(member: &str) -> String {
    format!(
        "{} ☣️ **Salomonisse Crônica.** O prazo de tratamento terminou.",
        mention(member)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::tests::at;

    #[test]
    fn test_offer_mentions_member_and_lifetime() {
        let text = treatment_offer("1001", Duration::minutes(10), "💊");
        assert!(text.starts_with("<@1001>"));
        assert!(text.contains("**10 minutos**"));
        assert!(text.contains("Reaja com 💊"));
    }

    #[test]
    fn test_started_shows_local_cure_time() {
        let text = treatment_started("1001", at(47));
        assert!(text.contains("00:47"));
    }

    #[test]
    fn test_outcome_texts() {
        assert!(cured("7").starts_with("<@7>"));
        assert!(chronic("7").contains("Crônica"));
    }
}
