//! Canned bilingual assistant strings behind one locale key, so no response
//! text is assembled ad hoc at the call sites.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    English,
    Indonesian,
}

impl Locale {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Self::English),
            "id" | "indonesian" => Some(Self::Indonesian),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Indonesian => "id",
        }
    }

    pub fn greeting_reply(&self) -> &'static str {
        match self {
            Self::English => "Hello! 👋 How can I help you find products today?",
            Self::Indonesian => "Halo! 👋 Mau cari makanan atau minuman apa hari ini?",
        }
    }

    pub fn help_reply(&self) -> &'static str {
        match self {
            Self::English => {
                "I can help you find products! Try asking:\n\
                 • \"I want nasi padang\"\n\
                 • \"Show me something sweet\"\n\
                 • \"Find cheap food\"\n\
                 • \"What drinks do you have?\""
            }
            Self::Indonesian => {
                "Aku bisa bantu cari produk! Coba tanya:\n\
                 • \"Mau nasi padang\"\n\
                 • \"Ada yang manis gak?\"\n\
                 • \"Cari makanan murah\"\n\
                 • \"Minumannya apa aja?\""
            }
        }
    }

    pub fn searching_reply(&self) -> &'static str {
        match self {
            Self::English => "Let me look for that in the catalog…",
            Self::Indonesian => "Sebentar, aku carikan di katalog…",
        }
    }

    pub fn nothing_found_reply(&self) -> &'static str {
        match self {
            Self::English => {
                "I'm not sure what you're looking for. Try asking for specific foods \
                 like 'nasi padang' or 'something sweet'!"
            }
            Self::Indonesian => {
                "Aku kurang yakin kamu cari apa. Coba sebut makanannya, misalnya \
                 'nasi padang' atau 'yang manis-manis'!"
            }
        }
    }

    pub fn generic_failure_reply(&self) -> &'static str {
        match self {
            Self::English => "Sorry, something went wrong. Please try again!",
            Self::Indonesian => "Maaf, ada yang salah. Coba lagi ya!",
        }
    }

    pub fn busy_reply(&self) -> &'static str {
        match self {
            Self::English => "Hold on, I'm still working on your last message…",
            Self::Indonesian => "Sebentar ya, pesanmu yang tadi masih diproses…",
        }
    }

    pub fn send_failure_reply(&self) -> &'static str {
        match self {
            Self::English => "Your message could not be sent. Please try again.",
            Self::Indonesian => "Pesanmu gagal terkirim. Coba kirim lagi ya.",
        }
    }

    pub fn order_failure_reply(&self) -> &'static str {
        match self {
            Self::English => "The order could not be placed. Please try again.",
            Self::Indonesian => "Pesanan gagal dibuat. Coba lagi ya.",
        }
    }

    pub fn reply_declined_notice(&self) -> &'static str {
        match self {
            Self::English => "Okay, I won't reply to the seller.",
            Self::Indonesian => "Oke, aku tidak balas ke penjualnya.",
        }
    }

    pub fn order_placed_notice(&self, product: &str, seller: &str, price: u64) -> String {
        let price = format_rupiah(price);
        match self {
            Self::English => format!(
                "✅ Great choice! You selected {product} from {seller} for Rp {price}. \
                 The seller has been notified!"
            ),
            Self::Indonesian => format!(
                "✅ Pilihan bagus! Kamu pesan {product} dari {seller} seharga Rp {price}. \
                 Penjual sudah diberi tahu!"
            ),
        }
    }

    pub fn seller_message_notice(&self, seller: &str, summary: &str) -> String {
        match self {
            Self::English => format!("💬 {seller} says: {summary}"),
            Self::Indonesian => format!("💬 {seller} bilang: {summary}"),
        }
    }

    pub fn seller_sent_many_notice(&self, seller: &str, count: usize) -> String {
        match self {
            Self::English => format!("💬 {seller} sent {count} messages about your order."),
            Self::Indonesian => format!("💬 {seller} mengirim {count} pesan soal pesananmu."),
        }
    }

    pub fn reply_sent_notice(&self, seller: &str) -> String {
        match self {
            Self::English => format!("Sent to {seller} ✅"),
            Self::Indonesian => format!("Terkirim ke {seller} ✅"),
        }
    }
}

/// Thousands separated with dots, Indonesian style: 17000 as "17.000".
pub fn format_rupiah(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::{format_rupiah, Locale};

    #[test]
    fn locale_codes_round_trip() {
        assert_eq!(Locale::parse("en"), Some(Locale::English));
        assert_eq!(Locale::parse("ID"), Some(Locale::Indonesian));
        assert_eq!(Locale::parse("fr"), None);
        assert_eq!(Locale::Indonesian.code(), "id");
    }

    #[test]
    fn rupiah_formatting_groups_thousands() {
        assert_eq!(format_rupiah(5_000), "5.000");
        assert_eq!(format_rupiah(17_000), "17.000");
        assert_eq!(format_rupiah(1_250_000), "1.250.000");
        assert_eq!(format_rupiah(950), "950");
    }

    #[test]
    fn both_locales_have_distinct_greeting_copy() {
        assert_ne!(Locale::English.greeting_reply(), Locale::Indonesian.greeting_reply());
    }
}
