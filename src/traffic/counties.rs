use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Swedish county names keyed by Trafikverket county number.
static COUNTY_NUMBER_TO_NAME: Lazy<HashMap<i32, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (1, "Stockholm"),
        (3, "Uppsala"),
        (4, "Södermanland"),
        (5, "Östergötland"),
        (6, "Jönköping"),
        (7, "Kronoberg"),
        (8, "Kalmar"),
        (9, "Gotland"),
        (10, "Blekinge"),
        (12, "Skåne"),
        (13, "Halland"),
        (14, "Västra Götaland"),
        (17, "Värmland"),
        (18, "Örebro"),
        (19, "Västmanland"),
        (20, "Dalarna"),
        (21, "Gävleborg"),
        (22, "Västernorrland"),
        (23, "Jämtland"),
        (24, "Västerbotten"),
        (25, "Norrbotten"),
    ])
});

pub fn name_for(county_no: i32) -> Option<&'static str> {
    COUNTY_NUMBER_TO_NAME.get(&county_no).copied()
}

pub fn is_known(county_no: i32) -> bool {
    COUNTY_NUMBER_TO_NAME.contains_key(&county_no)
}
