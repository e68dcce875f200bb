//! Customer-facing text. Customers chat in Spanish and the transport renders `*bold*`.

use rust_decimal::Decimal;

use tendero_core::catalog::CategorySummary;
use tendero_core::domain::order::{OrderNumber, PendingOrder};
use tendero_core::domain::product::{Product, Variation};
use tendero_core::flows::{BuyerField, FieldValidationError};

use crate::prompts::Persona;

pub const APOLOGY: &str = "Lo siento, hubo un error al procesar tu mensaje.";
pub const GENERAL_FALLBACK: &str = "Lo siento, en este momento no puedo procesar tu mensaje. \
                                    ¿Te gustaría ver nuestro catálogo de productos?";

const CASH_ON_DELIVERY: &str = "¿Le gustaría obtenerlo?\nSi lo pides hoy, lo pagas cuando llegue \
                                a tu casa con nuestro servicio de contra-entrega";

pub fn format_price(price: Decimal) -> String {
    let text = price.round_dp(2).normalize().to_string();
    let (integer, fraction) = match text.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (text.as_str(), None),
    };

    let (sign, digits) = match integer.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", integer),
    };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    match fraction {
        Some(fraction) => format!("{sign}${grouped},{fraction}"),
        None => format!("{sign}${grouped}"),
    }
}

pub fn product_card(product: &Product) -> String {
    let mut card = String::from("Claro que si, esta es la informacion de nuestro producto\n\n");
    card.push_str("*🛒 Detalles del Producto*\n\n");
    card.push_str(&format!("*Nombre:* {}\n", product.name));
    card.push_str(&format!(
        "*Descripción:* {}\n",
        product.description.as_deref().unwrap_or("Sin descripción")
    ));
    card.push_str(&format!(
        "*Información adicional:* {}\n",
        product.additional_info.as_deref().unwrap_or("Sin información adicional")
    ));
    card.push_str(&format!("*Precio:* {}\n", format_price(product.price)));

    if product.requires_variation() {
        card.push_str("*Opciones disponibles:*\n");
        for variation in &product.variations {
            card.push_str(&variation_line(variation));
        }
        card.push('\n');
    } else if product.quantity > 0 {
        card.push_str(&format!("*Cantidad disponible:* {}\n\n", product.quantity));
    } else {
        card.push_str("*Cantidad disponible:* No especificada\n\n");
    }

    card.push_str(CASH_ON_DELIVERY);
    card
}

fn variation_line(variation: &Variation) -> String {
    format!(
        "• {} (ref. {}, {} disponibles)\n",
        variation.label(),
        variation.id.0,
        variation.quantity
    )
}

pub fn variation_required(product: &Product) -> String {
    let mut text = format!(
        "El producto *{}* viene en varias opciones. ¿Cuál prefieres? Escríbeme la talla o el \
         color que quieres:\n",
        product.name
    );
    for variation in &product.variations {
        text.push_str(&variation_line(variation));
    }
    text
}

pub fn funnel_intro(product: &Product, variation: Option<&Variation>) -> String {
    let chosen = variation.map(|variation| format!(" ({})", variation.label())).unwrap_or_default();
    format!(
        "¡Excelente elección! Vamos a registrar tu pedido de *{name}*{chosen}.\n\
         *Precio:* {price}\n\n\
         Necesito estos datos para el envío:\n\
         1. Nombre completo\n\
         2. Correo electrónico\n\
         3. Dirección de entrega\n\
         4. Ciudad\n\n\
         En cualquier momento puedes escribir:\n\
         *1* o *cambiar producto* para elegir otro producto\n\
         *2* o *cancelar* para cancelar el pedido\n\n\
         Por favor, escribe tu nombre completo.",
        name = product.name,
        price = format_price(product.price),
    )
}

pub fn field_prompt(field: BuyerField) -> String {
    match field {
        BuyerField::Name => "Por favor, escribe tu nombre completo.".to_owned(),
        BuyerField::Email => "Gracias. Ahora escribe tu correo electrónico.".to_owned(),
        BuyerField::Address => "Perfecto. ¿Cuál es la dirección de entrega?".to_owned(),
        BuyerField::City => "¿En qué ciudad recibes el pedido?".to_owned(),
    }
}

pub fn field_rejection(error: &FieldValidationError) -> String {
    match error {
        FieldValidationError::TooShort { field: BuyerField::Address, .. } => {
            "La dirección es muy corta. Escribe la dirección completa de entrega.".to_owned()
        }
        FieldValidationError::TooShort { field, min_chars } => format!(
            "Tu {} debe tener al menos {min_chars} caracteres. Inténtalo de nuevo.",
            field.label()
        ),
        FieldValidationError::MalformedEmail => {
            "Ese correo no parece válido. Escribe un correo como nombre@ejemplo.com.".to_owned()
        }
        FieldValidationError::Empty(field) => format!("Por favor, escribe tu {}.", field.label()),
    }
}

pub fn order_confirmation(order: &PendingOrder, order_number: OrderNumber) -> String {
    let mut text = String::from("✅ *¡Pedido confirmado!*\n\n");
    text.push_str(&format!("*Número de pedido:* {order_number}\n"));
    text.push_str(&format!("*Producto:* {}\n", order.product.name));
    if let Some(variation) = &order.variation {
        text.push_str(&format!("*Opción:* {}\n", variation.label()));
    }
    text.push_str(&format!("*Precio:* {}\n", format_price(order.product.price)));
    for field in [BuyerField::Name, BuyerField::Email, BuyerField::Address, BuyerField::City] {
        if let Some(value) = order.buyer.get(field) {
            text.push_str(&format!("*{}:* {value}\n", capitalize(field.label())));
        }
    }
    text.push_str("\nPagas cuando llegue a tu casa con nuestro servicio de contra-entrega. ");
    text.push_str("¡Gracias por tu compra!");
    text
}

pub fn transient_failure() -> String {
    "No pudimos registrar tu pedido en este momento, pero guardamos tus datos. Escríbenos \
     cualquier mensaje en unos minutos para reintentar, o *2* para cancelar."
        .to_owned()
}

pub fn cancellation_confirmation() -> String {
    "Tu pedido fue cancelado. Si necesitas algo más, aquí estoy.".to_owned()
}

pub fn resume_product_search(categories: &[CategorySummary]) -> String {
    with_categories("Listo, descartamos ese pedido. ¿Qué otro producto te interesa?", categories)
}

pub fn corrupted_order() -> String {
    "Hubo un problema con tu pedido en curso y tuvimos que reiniciarlo. Cuéntame de nuevo qué \
     producto quieres."
        .to_owned()
}

pub fn general_fallback(categories: &[CategorySummary]) -> String {
    with_categories(GENERAL_FALLBACK, categories)
}

pub fn help(persona: &Persona, categories: &[CategorySummary]) -> String {
    let intro = format!(
        "¡Hola! Soy {seller}, asesor de {store}. Puedo ayudarte a:\n\
         • Conocer los detalles y el precio de nuestros productos\n\
         • Hacer tu pedido con pago contra-entrega\n\n\
         Escríbeme el nombre del producto que buscas o cuéntame qué necesitas.\n\
         Escribe /info para saber más sobre mí.",
        seller = persona.seller_name,
        store = persona.store_name,
    );
    with_categories(&intro, categories)
}

pub fn bot_info(persona: &Persona) -> String {
    format!(
        "ℹ️ *Información*\n\
         🤖 Asesor: {seller}\n\
         🏪 Tienda: {store}\n\n\
         Respondo tus preguntas sobre el catálogo y tomo tu pedido con pago contra-entrega.",
        seller = persona.seller_name,
        store = persona.store_name,
    )
}

pub fn category_list(categories: &[CategorySummary]) -> String {
    let mut text = String::from("*Categorías disponibles:*\n");
    for category in categories {
        let noun = if category.product_count == 1 { "producto" } else { "productos" };
        text.push_str(&format!("• {} ({} {noun})\n", category.name, category.product_count));
    }
    text
}

fn with_categories(lead: &str, categories: &[CategorySummary]) -> String {
    if categories.is_empty() {
        lead.to_owned()
    } else {
        format!("{lead}\n\n{}", category_list(categories).trim_end())
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use tendero_core::catalog::CategorySummary;
    use tendero_core::domain::order::{OrderNumber, PendingOrder};
    use tendero_core::domain::product::{Product, ProductId, Variation, VariationId};
    use tendero_core::domain::user::UserId;
    use tendero_core::flows::BuyerField;

    use super::{format_price, general_fallback, order_confirmation, product_card, GENERAL_FALLBACK};

    fn camisa() -> Product {
        Product {
            id: ProductId(1),
            name: "Camisa".to_owned(),
            description: Some("Algodón".to_owned()),
            additional_info: None,
            price: Decimal::new(50_000, 0),
            quantity: 8,
            category: "Moda".to_owned(),
            variations: Vec::new(),
        }
    }

    #[test]
    fn prices_use_thousands_separators() {
        assert_eq!(format_price(Decimal::new(50_000, 0)), "$50.000");
        assert_eq!(format_price(Decimal::new(1_250_000, 0)), "$1.250.000");
        assert_eq!(format_price(Decimal::new(999, 0)), "$999");
        assert_eq!(format_price(Decimal::new(8_990_050, 2)), "$89.900,5");
        assert_eq!(format_price(Decimal::ZERO), "$0");
        assert_eq!(format_price(Decimal::new(-1_500, 0)), "-$1.500");
    }

    #[test]
    fn card_shows_quantity_or_variations() {
        let plain = product_card(&camisa());
        assert!(plain.starts_with("Claro que si, esta es la informacion de nuestro producto"));
        assert!(plain.contains("*Nombre:* Camisa"));
        assert!(plain.contains("*Información adicional:* Sin información adicional"));
        assert!(plain.contains("*Precio:* $50.000"));
        assert!(plain.contains("*Cantidad disponible:* 8"));
        assert!(plain.ends_with("con nuestro servicio de contra-entrega"));

        let mut zapatos = camisa();
        zapatos.variations = vec![Variation {
            id: VariationId(3),
            size: Some("40".to_owned()),
            color: Some("Negro".to_owned()),
            quantity: 2,
        }];
        let varied = product_card(&zapatos);
        assert!(varied.contains("• Talla 40 / Color Negro (ref. 3, 2 disponibles)"));
        assert!(!varied.contains("Cantidad disponible"));
    }

    #[test]
    fn confirmation_summarizes_buyer_data() {
        let mut order = PendingOrder::new(UserId("57300".to_owned()), camisa(), None, Utc::now());
        order.buyer.set(BuyerField::Name, "Juan Perez".to_owned());
        order.buyer.set(BuyerField::City, "Bogota".to_owned());

        let text = order_confirmation(&order, OrderNumber(482_913));
        assert!(text.contains("*Número de pedido:* 482913"));
        assert!(text.contains("*Nombre completo:* Juan Perez"));
        assert!(text.contains("*Ciudad:* Bogota"));
    }

    #[test]
    fn fallback_lists_categories_when_present() {
        assert_eq!(general_fallback(&[]), GENERAL_FALLBACK);
        let moda = CategorySummary { name: "Moda".to_owned(), product_count: 1 };
        let text = general_fallback(&[moda]);
        assert!(text.ends_with("• Moda (1 producto)"));
    }
}
