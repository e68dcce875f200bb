//! Deterministic stand-ins for the classifier when the model is out of quota or too slow.

use tendero_core::domain::product::{Product, Variation};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Keyword {
    /// Whole token.
    Word(&'static str),
    /// Token prefix, so "compr" covers "comprar", "comprarlo", "compro".
    Stem(&'static str),
    /// Consecutive tokens.
    Phrase(&'static str),
}

const PURCHASE_KEYWORDS: &[Keyword] = &[
    Keyword::Stem("compr"),
    Keyword::Stem("adquir"),
    Keyword::Phrase("me interesa"),
    Keyword::Phrase("lo quiero"),
    Keyword::Phrase("la quiero"),
    Keyword::Phrase("lo llevo"),
    Keyword::Phrase("la llevo"),
    Keyword::Word("si"),
    Keyword::Word("sí"),
    Keyword::Word("ok"),
    Keyword::Word("dale"),
];

/// Asking for information is never purchase intent, whatever else the message says.
const INFORMATION_STEMS: &[&str] = &["informaci", "detalle", "caracteristic", "característic"];

pub fn detect_purchase_keywords(message: &str) -> bool {
    let tokens = tokenize(&normalize_text(message));
    if tokens.iter().any(|token| INFORMATION_STEMS.iter().any(|stem| token.starts_with(stem))) {
        return false;
    }

    let joined = format!(" {} ", tokens.join(" "));
    PURCHASE_KEYWORDS.iter().any(|keyword| match keyword {
        Keyword::Word(word) => tokens.iter().any(|token| token == word),
        Keyword::Stem(stem) => tokens.iter().any(|token| token.starts_with(stem)),
        Keyword::Phrase(phrase) => joined.contains(&format!(" {phrase} ")),
    })
}

/// The catalog product whose name occurs furthest into the transcript.
///
/// Ties on position (one name prefixing another) go to the longer name. When several products
/// were discussed this simply picks the latest mention; it does not try to infer which one the
/// customer meant.
pub fn last_mentioned_product<'a>(context: &str, products: &'a [Product]) -> Option<&'a Product> {
    let haystack = normalize_text(context);
    latest_match(&haystack, products)
}

/// A catalog product named directly in the message.
pub fn mentioned_product<'a>(message: &str, products: &'a [Product]) -> Option<&'a Product> {
    let haystack = normalize_text(message);
    products
        .iter()
        .filter_map(|product| {
            let name = normalize_text(product.name.trim());
            (!name.is_empty() && haystack.contains(&name)).then_some((name.len(), product))
        })
        .max_by_key(|(length, _)| *length)
        .map(|(_, product)| product)
}

/// The single variation of `product` whose size or color appears as a token of the message.
/// Ambiguous messages ("M" when both a red and a blue M exist) resolve to nothing.
pub fn mentioned_variation<'a>(message: &str, product: &'a Product) -> Option<&'a Variation> {
    let tokens = tokenize(&normalize_text(message));
    let joined = format!(" {} ", tokens.join(" "));
    let mentions = |value: &Option<String>| {
        value.as_deref().map(|value| tokenize(&normalize_text(value)).join(" ")).is_some_and(
            |value| !value.is_empty() && joined.contains(&format!(" {value} ")),
        )
    };

    let mut candidates = product
        .variations
        .iter()
        .filter(|variation| mentions(&variation.size) || mentions(&variation.color))
        .collect::<Vec<_>>();
    if candidates.len() > 1 {
        candidates.retain(|variation| {
            (variation.size.is_none() || mentions(&variation.size))
                && (variation.color.is_none() || mentions(&variation.color))
        });
    }
    match candidates.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

fn latest_match<'a>(haystack: &str, products: &'a [Product]) -> Option<&'a Product> {
    products
        .iter()
        .filter_map(|product| {
            let name = normalize_text(product.name.trim());
            if name.is_empty() {
                return None;
            }
            haystack.rfind(&name).map(|position| ((position, name.len()), product))
        })
        .max_by_key(|(rank, _)| *rank)
        .map(|(_, product)| product)
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
}

fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_alphanumeric() {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(|token| token.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use tendero_core::domain::product::{Product, ProductId, Variation, VariationId};

    use super::{
        detect_purchase_keywords, last_mentioned_product, mentioned_product, mentioned_variation,
    };

    fn product(id: i64, name: &str) -> Product {
        Product {
            id: ProductId(id),
            name: name.to_owned(),
            description: None,
            additional_info: None,
            price: Decimal::new(10_000, 0),
            quantity: 1,
            category: "Otros".to_owned(),
            variations: Vec::new(),
        }
    }

    #[test]
    fn purchase_keywords_match_words_stems_and_phrases() {
        struct Case {
            text: &'static str,
            expected: bool,
        }

        let cases = [
            Case { text: "si", expected: true },
            Case { text: "Sí, por favor", expected: true },
            Case { text: "OK", expected: true },
            Case { text: "quiero comprarlo", expected: true },
            Case { text: "Me interesa mucho", expected: true },
            Case { text: "deseo adquirir uno", expected: true },
            Case { text: "lo quiero ya!", expected: true },
            Case { text: "necesito información de la camisa", expected: false },
            Case { text: "quiero detalles para comprar", expected: false },
            Case { text: "hola, buenas tardes", expected: false },
            Case { text: "silla", expected: false },
            Case { text: "okey", expected: false },
            Case { text: "", expected: false },
        ];

        for case in cases {
            assert_eq!(detect_purchase_keywords(case.text), case.expected, "{:?}", case.text);
        }
    }

    #[test]
    fn last_mention_wins_in_transcript() {
        let products = vec![product(1, "Camisa"), product(2, "Zapatos"), product(3, "Gorra")];
        let context = "cliente: tienen camisas?\nbot: sí, la Camisa cuesta 50000\n\
                       cliente: y zapatos?\nbot: los Zapatos cuestan 120000\n";

        let found = last_mentioned_product(context, &products).map(|p| p.name.as_str());
        assert_eq!(found, Some("Zapatos"));
        assert!(last_mentioned_product("nada relevante", &products).is_none());
    }

    #[test]
    fn longer_name_wins_on_shared_prefix() {
        let products = vec![product(1, "Camisa"), product(2, "Camisa Polo")];
        let found = last_mentioned_product("me gustó la camisa polo", &products);
        assert_eq!(found.map(|p| p.id.0), Some(2));
    }

    #[test]
    fn mentioned_product_requires_full_name_in_message() {
        let products = vec![product(1, "Camisa"), product(2, "Camisa Polo"), product(3, "  ")];
        let polo = mentioned_product("precio de la camisa polo?", &products);
        assert_eq!(polo.map(|p| p.id.0), Some(2));
        assert_eq!(mentioned_product("CAMISA", &products).map(|p| p.id.0), Some(1));
        assert!(mentioned_product("cami", &products).is_none());
    }

    #[test]
    fn variation_is_picked_by_size_or_color_when_unambiguous() {
        let variation = |id, size: &str, color: &str| Variation {
            id: VariationId(id),
            size: Some(size.to_owned()),
            color: Some(color.to_owned()),
            quantity: 2,
        };
        let mut zapatos = product(2, "Zapatos");
        zapatos.variations = vec![
            variation(1, "38", "Negro"),
            variation(2, "40", "Negro"),
            variation(3, "40", "Cafe"),
        ];

        assert_eq!(mentioned_variation("talla 38", &zapatos).map(|v| v.id.0), Some(1));
        assert_eq!(mentioned_variation("los 40 en cafe", &zapatos).map(|v| v.id.0), Some(3));
        assert!(mentioned_variation("talla 40", &zapatos).is_none());
        assert!(mentioned_variation("quiero unos zapatos", &zapatos).is_none());
        assert!(mentioned_variation("talla 380", &zapatos).is_none());
    }
}
