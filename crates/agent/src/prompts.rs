use serde::Serialize;

use tendero_core::domain::product::Product;

/// Who the assistant speaks as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Persona {
    pub store_name: String,
    pub seller_name: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self { store_name: "99envios".to_owned(), seller_name: "Juan Manuel".to_owned() }
    }
}

pub const NO_MATCH: &str = "0";

#[derive(Serialize)]
struct PromptProduct<'a> {
    nombre: &'a str,
    categoria: &'a str,
    precio: String,
    cantidad: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    descripcion: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    variaciones: Vec<PromptVariation>,
}

#[derive(Serialize)]
struct PromptVariation {
    id: i64,
    detalle: String,
    cantidad: u32,
}

pub fn catalog_json(products: &[Product]) -> String {
    let rows = products
        .iter()
        .map(|product| PromptProduct {
            nombre: &product.name,
            categoria: &product.category,
            precio: product.price.normalize().to_string(),
            cantidad: product.quantity,
            descripcion: product.description.as_deref(),
            variaciones: product
                .variations
                .iter()
                .map(|variation| PromptVariation {
                    id: variation.id.0,
                    detalle: variation.label(),
                    cantidad: variation.quantity,
                })
                .collect(),
        })
        .collect::<Vec<_>>();
    serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_owned())
}

pub fn general_reply(persona: &Persona, catalog: &str, context: &str, message: &str) -> String {
    format!(
        "Actúa como un vendedor llamado {seller}, amable y profesional, de la tienda {store}.\n\
         Estos son los productos que vendemos: {catalog}\n\
         Responde al siguiente mensaje del cliente: \"{message}\"\n\
         Si el cliente escribe palabras como necesito, quiero o me gustaría, atiende el \
         complemento de la oración y busca entre los productos lo que el cliente requiere.\n\
         Mantén un tono amable, profesional y orientado a ventas.\n\
         Si el cliente muestra interés en alguna categoría, ofrece los productos de esa categoría.\n\
         Ten en cuenta la conversación anterior: \"{context}\"",
        seller = persona.seller_name,
        store = persona.store_name,
    )
}

pub fn product_query(catalog: &str, context: &str, message: &str) -> String {
    format!(
        "Contexto: estos son los productos disponibles: {catalog}\n\
         Mensaje del usuario: {message}\n\
         Si el usuario pregunta por información de un producto específico, devuelve el nombre \
         exacto del producto tal como aparece en la lista.\n\
         Si no pregunta por un producto específico, devuelve \"{NO_MATCH}\".\n\
         Devuelve solo el nombre del producto o \"{NO_MATCH}\", sin texto adicional.\n\
         Conversación anterior: {context}"
    )
}

pub fn purchase_intent(catalog: &str, context: &str, message: &str) -> String {
    format!(
        "Contexto: estos son los productos disponibles: {catalog}\n\
         Conversación anterior: {context}\n\
         Mensaje del usuario: {message}\n\
         Decide si el usuario quiere COMPRAR un producto ahora mismo.\n\
         Pedir información, detalles, precio o disponibilidad (por ejemplo \"necesito \
         información\" o \"quiero detalles\") NO es intención de compra.\n\
         Una afirmación corta (\"sí\", \"ok\", \"lo quiero\") después de que se mostró un \
         producto sí es intención de compra de ese producto.\n\
         Si hay intención de compra devuelve el nombre exacto del producto. Si el usuario eligió \
         una variación devuelve \"nombre | id_variacion\".\n\
         Si no hay intención de compra devuelve \"{NO_MATCH}\". Sin texto adicional."
    )
}
