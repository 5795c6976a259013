//! System-prompt assembly. The persona, the enumerated catalog slice, the
//! shopper-memory hint, and the seller-reply rubric are locale-keyed tera
//! templates rendered once per request.

use std::sync::OnceLock;

use tera::{Context, Tera};

use lapak_core::domain::product::Product;
use lapak_core::locale::Locale;
use lapak_core::memory::ShopperMemory;

use crate::router::ActiveSellerContext;

const SYSTEM_EN: &str = r#"You are the shopping assistant for an Indonesian food marketplace. Buyers are kings: stay warm, concise, and reply in English.
Classify the buyer's message and answer ONLY with a JSON object using these keys:
  "intent": one of "search" | "greeting" | "help" | "chat" | "not_found" | "followup" | "reply_to_seller"
  "selectedProducts": up to 5 item names copied verbatim from the catalog below
  "userWant": a short summary of what the buyer is after
  "responseText": the reply shown to the buyer
  "productComment": optional short note shown next to the products
  "notFoundItem": what the buyer asked for that the catalog lacks (intent "not_found" only)
  "messageForSeller": the polished message to forward (intent "reply_to_seller" only)
Rules:
- Pick product names only from the catalog, copied exactly as written.
- When the buyer asks for something the catalog does not have, use intent "not_found", name it in "notFoundItem", and offer similar catalog items of the same kind (food for food, drinks for drinks) in "selectedProducts".
- Use "followup" when the buyer refers back to products or answers you already gave.
- Never invent prices or sellers. Never answer with anything except the JSON object.

Catalog ({{ catalog_count }} items):
{{ catalog_block }}
{{ shopper_hint_block }}{{ seller_rubric_block }}"#;

const SYSTEM_ID: &str = r#"Kamu asisten belanja untuk pasar makanan Indonesia. Pembeli adalah raja: jawab ramah, singkat, dan dalam bahasa Indonesia.
Klasifikasikan pesan pembeli dan jawab HANYA dengan objek JSON berkunci:
  "intent": salah satu dari "search" | "greeting" | "help" | "chat" | "not_found" | "followup" | "reply_to_seller"
  "selectedProducts": maksimal 5 nama produk yang disalin persis dari katalog di bawah
  "userWant": ringkasan singkat keinginan pembeli
  "responseText": balasan yang ditampilkan ke pembeli
  "productComment": catatan singkat opsional di samping daftar produk
  "notFoundItem": barang yang diminta tapi tidak ada di katalog (khusus intent "not_found")
  "messageForSeller": pesan rapi untuk diteruskan (khusus intent "reply_to_seller")
Aturan:
- Nama produk hanya dari katalog, disalin persis.
- Kalau barangnya tidak ada, pakai intent "not_found", sebut di "notFoundItem", dan tawarkan produk katalog sejenis (makanan untuk makanan, minuman untuk minuman) di "selectedProducts".
- Pakai "followup" kalau pembeli merujuk ke jawaban atau produk sebelumnya.
- Jangan mengarang harga atau penjual. Jangan menjawab apa pun selain objek JSON.

Katalog ({{ catalog_count }} item):
{{ catalog_block }}
{{ shopper_hint_block }}{{ seller_rubric_block }}"#;

const RUBRIC_EN: &str = r#"
The buyer is mid-conversation with seller "{{ seller_name }}" about their "{{ product_name }}" order.
The seller last said: "{{ last_message }}"
Decide whether the new buyer message is a reply meant for that seller or a normal catalog request.
Short answers like "mau", "ok", "yes", "boleh", "gak usah" are almost always replies to the seller — when in doubt, treat a short message as a seller reply.
For a seller reply: intent "reply_to_seller", and put a polished version of the buyer's words in "messageForSeller" — keep the exact sentiment, keep it short, do not over-formalize agreement or disagreement.
Worked examples:
- seller asked "mau pedes gak?", buyer says "mau" -> {"intent":"reply_to_seller","messageForSeller":"Iya, mau yang pedas."}
- seller asked "ready jam 5, oke?", buyer says "ok sip" -> {"intent":"reply_to_seller","messageForSeller":"Oke, jam 5 sip."}
- buyer says "ada es teler gak?" -> a catalog search, not a seller reply."#;

const RUBRIC_ID: &str = r#"
Pembeli sedang ngobrol dengan penjual "{{ seller_name }}" soal pesanan "{{ product_name }}".
Pesan terakhir penjual: "{{ last_message }}"
Tentukan apakah pesan baru pembeli adalah balasan untuk penjual itu atau permintaan katalog biasa.
Jawaban pendek seperti "mau", "ok", "boleh", "gak usah" hampir selalu balasan untuk penjual — kalau ragu, anggap pesan pendek sebagai balasan penjual.
Untuk balasan penjual: intent "reply_to_seller", isi "messageForSeller" dengan versi rapi dari kata-kata pembeli — pertahankan maksudnya persis, tetap singkat, jangan dibuat kaku.
Contoh:
- penjual tanya "mau pedes gak?", pembeli jawab "mau" -> {"intent":"reply_to_seller","messageForSeller":"Iya, mau yang pedas."}
- pembeli bilang "ada es teler gak?" -> pencarian katalog, bukan balasan penjual."#;

const HINT_EN: &str = "\nEarlier this shopper wanted: {{ shopper_hint }}\n";
const HINT_ID: &str = "\nSebelumnya pembeli ini mencari: {{ shopper_hint }}\n";

fn templates() -> &'static Tera {
    static TERA: OnceLock<Tera> = OnceLock::new();
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("system.en", SYSTEM_EN),
            ("system.id", SYSTEM_ID),
            ("rubric.en", RUBRIC_EN),
            ("rubric.id", RUBRIC_ID),
            ("hint.en", HINT_EN),
            ("hint.id", HINT_ID),
        ])
        .expect("embedded prompt templates are well-formed");
        tera
    })
}

fn template_name(kind: &str, locale: Locale) -> String {
    format!("{kind}.{}", locale.code())
}

pub struct PromptBuilder {
    locale: Locale,
    catalog_prompt_limit: usize,
}

impl PromptBuilder {
    pub fn new(locale: Locale, catalog_prompt_limit: usize) -> Self {
        Self { locale, catalog_prompt_limit }
    }

    /// Render the full system prompt for one resolution.
    pub fn system_prompt(
        &self,
        catalog: &[Product],
        shopper_memory: Option<&ShopperMemory>,
        seller_context: Option<&ActiveSellerContext>,
    ) -> String {
        let enumerated: Vec<&Product> =
            catalog.iter().take(self.catalog_prompt_limit).collect();
        let catalog_block = enumerated
            .iter()
            .map(|product| {
                format!(
                    "- {} | {} | Rp {}",
                    product.name,
                    product.category,
                    lapak_core::locale::format_rupiah(product.price)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let shopper_hint_block = shopper_memory
            .map(|memory| {
                let hint = memory.user_want.as_deref().unwrap_or(&memory.summary);
                let mut context = Context::new();
                context.insert("shopper_hint", hint);
                templates()
                    .render(&template_name("hint", self.locale), &context)
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        let seller_rubric_block = seller_context
            .map(|seller| {
                let mut context = Context::new();
                context.insert("seller_name", &seller.seller_name);
                context.insert("product_name", &seller.product_name);
                context.insert("last_message", &seller.last_message);
                templates()
                    .render(&template_name("rubric", self.locale), &context)
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        let mut context = Context::new();
        context.insert("catalog_count", &enumerated.len());
        context.insert("catalog_block", &catalog_block);
        context.insert("shopper_hint_block", &shopper_hint_block);
        context.insert("seller_rubric_block", &seller_rubric_block);

        templates().render(&template_name("system", self.locale), &context).unwrap_or_else(|error| {
            // A render failure must not take the pipeline down; the resolver
            // can still work from the bare catalog enumeration.
            tracing::warn!(
                event_name = "prompt.render_failed",
                error = %error,
                "system prompt template failed to render"
            );
            catalog_block
        })
    }

    /// Style rules for rewriting a buyer reply before relaying it.
    pub fn paraphrase_prompt(&self, seller_name: &str) -> String {
        match self.locale {
            Locale::English => format!(
                "Rewrite the buyer's message as a short chat message to the seller \"{seller_name}\". \
                 Preserve the exact sentiment and meaning, shorten if possible, and do not \
                 over-formalize short agreement or disagreement. Reply with the rewritten \
                 message text only, no quotes and no JSON."
            ),
            Locale::Indonesian => format!(
                "Tulis ulang pesan pembeli sebagai pesan chat singkat untuk penjual \"{seller_name}\". \
                 Pertahankan maksud dan nada persis, persingkat bila bisa, dan jangan bikin kaku \
                 jawaban setuju/tidak setuju yang pendek. Balas hanya dengan teks pesannya saja, \
                 tanpa tanda kutip dan tanpa JSON."
            ),
        }
    }

    /// Instructions for summarizing a batch of buffered seller messages.
    pub fn batch_summary_prompt(&self, seller_name: &str, messages: &[String]) -> String {
        let joined = messages
            .iter()
            .map(|message| format!("- {message}"))
            .collect::<Vec<_>>()
            .join("\n");
        match self.locale {
            Locale::English => format!(
                "The seller \"{seller_name}\" sent these messages about the buyer's order:\n{joined}\n\
                 Summarize them for the buyer in one short friendly sentence. Reply with the \
                 sentence only, no JSON."
            ),
            Locale::Indonesian => format!(
                "Penjual \"{seller_name}\" mengirim pesan-pesan ini soal pesanan pembeli:\n{joined}\n\
                 Ringkas untuk pembeli dalam satu kalimat singkat yang ramah. Balas hanya dengan \
                 kalimatnya saja, tanpa JSON."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use lapak_core::catalog::sample_products;
    use lapak_core::domain::order::OrderId;
    use lapak_core::locale::Locale;
    use lapak_core::memory::ShopperMemory;

    use super::PromptBuilder;
    use crate::router::ActiveSellerContext;

    #[test]
    fn system_prompt_enumerates_the_catalog_up_to_the_limit() {
        let builder = PromptBuilder::new(Locale::English, 3);
        let prompt = builder.system_prompt(&sample_products(), None, None);

        assert!(prompt.contains("Catalog (3 items):"));
        assert!(prompt.contains("Nasi Rendang"));
        // The fourth item falls outside the prompt limit.
        assert!(!prompt.contains("Nasi Dendeng Balado"));
    }

    #[test]
    fn shopper_hint_appears_only_when_memory_exists() {
        let builder = PromptBuilder::new(Locale::English, 50);
        let without = builder.system_prompt(&sample_products(), None, None);
        assert!(!without.contains("Earlier this shopper wanted"));

        let memory = ShopperMemory {
            user_want: Some("something sweet".to_string()),
            intent: "search".to_string(),
            summary: "sweet and cheap".to_string(),
            at: Utc::now(),
        };
        let with = builder.system_prompt(&sample_products(), Some(&memory), None);
        assert!(with.contains("Earlier this shopper wanted: something sweet"));
    }

    #[test]
    fn seller_rubric_appears_only_with_active_context() {
        let builder = PromptBuilder::new(Locale::English, 50);
        let context = ActiveSellerContext {
            order_id: OrderId("order-1".to_string()),
            seller_name: "Padang Jaya".to_string(),
            product_name: "Nasi Rendang".to_string(),
            last_message: "mau pedes gak?".to_string(),
            timestamp: Utc::now(),
        };

        let prompt = builder.system_prompt(&sample_products(), None, Some(&context));
        assert!(prompt.contains("mid-conversation with seller \"Padang Jaya\""));
        assert!(prompt.contains("mau pedes gak?"));

        let plain = builder.system_prompt(&sample_products(), None, None);
        assert!(!plain.contains("mid-conversation"));
    }

    #[test]
    fn indonesian_templates_render_in_indonesian() {
        let builder = PromptBuilder::new(Locale::Indonesian, 50);
        let prompt = builder.system_prompt(&sample_products(), None, None);
        assert!(prompt.contains("Katalog"));
        assert!(prompt.contains("asisten belanja"));
    }
}
