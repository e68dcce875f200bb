pub const OTHER_CATEGORY_ID: u32 = 22;

pub const CATEGORIES: [(u32, &str); 22] = [
    (1, "Bisutería"),
    (2, "Ropa Deportiva"),
    (3, "Vaporizadores"),
    (4, "Mascotas"),
    (5, "Moda"),
    (6, "Tecnología"),
    (7, "Cocina"),
    (8, "Belleza"),
    (9, "Salud"),
    (10, "Hogar"),
    (11, "Natural Home"),
    (12, "Deportes"),
    (13, "Sex Shop"),
    (14, "Bebé"),
    (15, "Aseo"),
    (16, "Bienestar"),
    (17, "Camping"),
    (18, "Pesca"),
    (19, "Defensa Personal"),
    (20, "Vehículos"),
    (21, "Juguetería"),
    (OTHER_CATEGORY_ID, "Otros"),
];

/// Display name for a raw category id; missing or unknown ids land in "Otros".
pub fn category_name(id: Option<u32>) -> &'static str {
    id.and_then(known_category).unwrap_or(CATEGORIES[CATEGORIES.len() - 1].1)
}

pub fn known_category(id: u32) -> Option<&'static str> {
    CATEGORIES.iter().find(|(known, _)| *known == id).map(|(_, name)| *name)
}
