//! Static normalization tables.
//!
//! All tables are immutable, built once at first use, and keyed by
//! lowercased surface forms. The MWE tables encode marketplace domain
//! knowledge (the condition hierarchy in particular) and are applied after
//! abbreviation expansion, before lemmatization.

use fxhash::{FxHashMap, FxHashSet};
use once_cell::sync::Lazy;

fn table(pairs: &[(&'static str, &'static str)]) -> FxHashMap<&'static str, &'static str> {
    pairs.iter().copied().collect()
}

/// Shorthand → expansion. Full-string lookup is attempted first, then
/// per-token, so "ac" and "2nd hand" both expand.
pub static ABBREVIATIONS: Lazy<FxHashMap<&'static str, &'static str>> = Lazy::new(|| {
    table(&[
        ("ac", "air conditioning"),
        ("a/c", "air conditioning"),
        ("aircon", "air conditioning"),
        ("tv", "television"),
        ("fridge", "refrigerator"),
        ("1st", "first"),
        ("2nd", "second"),
        ("3rd", "third"),
        ("bhk", "bedroom hall kitchen"),
        ("sqft", "square feet"),
        ("sq ft", "square feet"),
        ("sqm", "square meters"),
        ("gb", "gigabyte"),
        ("tb", "terabyte"),
        ("km", "kilometer"),
        ("kms", "kilometers"),
        ("hr", "hour"),
        ("hrs", "hours"),
        ("min", "minimum"),
        ("max", "maximum"),
        ("approx", "approximately"),
        ("veg", "vegetarian"),
        ("non-veg", "non vegetarian"),
        ("yr", "year"),
        ("yrs", "years"),
        ("exp", "experience"),
        ("govt", "government"),
        ("apt", "apartment"),
        ("br", "bedroom"),
        ("ba", "bathroom"),
        ("pwr", "power"),
        ("auto", "automatic"),
        ("manual trans", "manual transmission"),
        ("wifi", "wireless internet"),
        ("wi-fi", "wireless internet"),
    ])
});

/// General multi-word-expression reductions, applied to any attribute.
/// The condition block mirrors the marketplace condition hierarchy:
/// new / like_new / very_good / good / acceptable / used / damaged.
pub static GENERAL_MWE: Lazy<FxHashMap<&'static str, &'static str>> = Lazy::new(|| {
    table(&[
        // new: brand new items in original packaging
        ("brand new", "new"),
        ("brand-new", "new"),
        ("factory sealed", "new"),
        ("factory new", "new"),
        ("box packed", "new"),
        ("box piece", "new"),
        ("sealed pack", "new"),
        ("unopened", "new"),
        ("unused", "new"),
        // like_new: virtually new with minimal imperfections
        ("like new", "like_new"),
        ("as good as new", "like_new"),
        ("mint condition", "like_new"),
        ("barely used", "like_new"),
        ("barely touched", "like_new"),
        ("hardly used", "like_new"),
        // very_good: lightly used with minor cosmetic issues
        ("lightly used", "very_good"),
        ("gently used", "very_good"),
        ("gently worn", "very_good"),
        ("slightly used", "very_good"),
        ("excellent condition", "very_good"),
        // good: shows wear from consistent use
        ("well used", "good"),
        ("good condition", "good"),
        ("well maintained", "good"),
        // acceptable: heavy wear but usable
        ("heavily used", "acceptable"),
        ("fair condition", "acceptable"),
        // used: generic used without a sub-category
        ("pre-owned", "used"),
        ("pre owned", "used"),
        ("preowned", "used"),
        ("second hand", "used"),
        ("second-hand", "used"),
        ("secondhand", "used"),
        ("2nd hand", "used"),
        ("previously owned", "used"),
        ("one owner", "used"),
        ("single owner", "used"),
        // damaged / for_parts
        ("needs repair", "damaged"),
        ("needs fixing", "damaged"),
        ("for parts", "for_parts"),
        ("not working", "damaged"),
        ("not functional", "damaged"),
        ("dead", "damaged"),
        // availability / timing
        ("right away", "immediate"),
        ("right now", "immediate"),
        ("as soon as possible", "immediate"),
        ("asap", "immediate"),
        ("at the earliest", "immediate"),
        ("at your earliest convenience", "immediate"),
        ("on the spot", "immediate"),
        ("walk in", "immediate"),
        ("walk-in", "immediate"),
        // pricing
        ("free of cost", "free"),
        ("no charge", "free"),
        ("no cost", "free"),
        ("complimentary", "free"),
        ("on the house", "free"),
        ("at no extra cost", "free"),
        ("negotiable price", "negotiable"),
        ("price negotiable", "negotiable"),
        ("best offer", "negotiable"),
        ("or best offer", "negotiable"),
        ("obo", "negotiable"),
        ("fixed price", "fixed"),
        ("firm price", "fixed"),
        ("no bargaining", "fixed"),
        // experience
        ("entry level", "beginner"),
        ("entry-level", "beginner"),
        ("no experience", "beginner"),
        ("fresher", "beginner"),
        ("fresh graduate", "beginner"),
        ("mid level", "intermediate"),
        ("mid-level", "intermediate"),
        ("some experience", "intermediate"),
        ("senior level", "expert"),
        ("senior-level", "expert"),
        ("highly experienced", "expert"),
        ("very experienced", "expert"),
        // boolean-ish
        ("not required", "no"),
        ("not needed", "no"),
        ("not necessary", "no"),
        ("optional", "no"),
        ("required", "yes"),
        ("mandatory", "yes"),
        ("must have", "yes"),
        ("must-have", "yes"),
        ("compulsory", "yes"),
    ])
});

/// Attribute-scoped MWE overrides, consulted before [`GENERAL_MWE`].
pub static ATTRIBUTE_MWE: Lazy<FxHashMap<&'static str, FxHashMap<&'static str, &'static str>>> =
    Lazy::new(|| {
        let mut map = FxHashMap::default();
        map.insert(
            "condition",
            table(&[
                ("brand new", "new"),
                ("brand-new", "new"),
                ("like new", "like_new"),
                ("mint condition", "like_new"),
                ("barely used", "like_new"),
                ("barely touched", "like_new"),
                ("hardly used", "like_new"),
                ("lightly used", "very_good"),
                ("gently used", "very_good"),
                ("gently worn", "very_good"),
                ("excellent condition", "very_good"),
                ("good condition", "good"),
                ("fair condition", "acceptable"),
                ("pre-owned", "used"),
                ("pre owned", "used"),
                ("second hand", "used"),
                ("second-hand", "used"),
                ("secondhand", "used"),
                ("refurbished", "refurbished"),
                ("renewed", "refurbished"),
                ("reconditioned", "refurbished"),
                ("restored", "refurbished"),
                ("for parts", "for_parts"),
                ("for spares", "for_parts"),
                ("parts only", "for_parts"),
                ("salvage title", "for_parts"),
            ]),
        );
        map.insert(
            "fuel",
            table(&[
                ("petrol", "gasoline"),
                ("gas", "gasoline"),
                ("diesel fuel", "diesel"),
                ("electric motor", "electric"),
                ("battery powered", "electric"),
                ("battery-powered", "electric"),
                ("plug in hybrid", "plug in hybrid electric"),
                ("plug-in hybrid", "plug in hybrid electric"),
                ("compressed natural gas", "cng"),
                ("liquefied petroleum gas", "lpg"),
                ("flex fuel", "flex fuel"),
                ("bi fuel", "bi fuel"),
                ("dual fuel", "bi fuel"),
                ("hydrogen fuel cell", "hydrogen"),
            ]),
        );
        map.insert(
            "transmission",
            table(&[
                ("manual transmission", "manual"),
                ("stick shift", "manual"),
                ("standard", "manual"),
                ("automatic transmission", "automatic"),
                ("automatic", "automatic"),
                ("semi automatic", "semi automatic"),
                ("semi-automatic", "semi automatic"),
                ("tiptronic", "automatic"),
                ("paddle shift", "automatic"),
            ]),
        );
        map.insert(
            "furnishing",
            table(&[
                ("fully furnished", "furnished"),
                ("fully-furnished", "furnished"),
                ("semi furnished", "semi furnished"),
                ("semi-furnished", "semi furnished"),
                ("partially furnished", "semi furnished"),
                ("not furnished", "unfurnished"),
                ("bare shell", "unfurnished"),
            ]),
        );
        map.insert(
            "employment_type",
            table(&[
                ("full time", "full time"),
                ("full-time", "full time"),
                ("part time", "part time"),
                ("part-time", "part time"),
                ("work from home", "remote"),
                ("wfh", "remote"),
                ("on site", "onsite"),
                ("on-site", "onsite"),
                ("in office", "onsite"),
                ("in-office", "onsite"),
            ]),
        );
        map.insert(
            "diet",
            table(&[
                ("pure vegetarian", "vegetarian"),
                ("strict vegetarian", "vegetarian"),
                ("non vegetarian", "non vegetarian"),
                ("non-veg", "non vegetarian"),
                ("nonveg", "non vegetarian"),
                ("egg", "eggetarian"),
                ("eggitarian", "eggetarian"),
            ]),
        );
        map
    });

/// UK → US spelling normalization, word level.
pub static UK_TO_US: Lazy<FxHashMap<&'static str, &'static str>> = Lazy::new(|| {
    table(&[
        ("colour", "color"),
        ("colours", "colors"),
        ("flavour", "flavor"),
        ("flavours", "flavors"),
        ("favourite", "favorite"),
        ("behaviour", "behavior"),
        ("neighbour", "neighbor"),
        ("neighbourhood", "neighborhood"),
        ("labour", "labor"),
        ("honour", "honor"),
        ("armour", "armor"),
        ("centre", "center"),
        ("metre", "meter"),
        ("litre", "liter"),
        ("theatre", "theater"),
        ("fibre", "fiber"),
        ("organise", "organize"),
        ("organised", "organized"),
        ("recognise", "recognize"),
        ("customise", "customize"),
        ("customised", "customized"),
        ("analyse", "analyze"),
        ("catalogue", "catalog"),
        ("dialogue", "dialog"),
        ("programme", "program"),
        ("grey", "gray"),
        ("tyre", "tire"),
        ("tyres", "tires"),
        ("aluminium", "aluminum"),
        ("jewellery", "jewelry"),
        ("cheque", "check"),
        ("licence", "license"),
        ("defence", "defense"),
        ("practise", "practice"),
        ("storey", "story"),
        ("mould", "mold"),
        ("plough", "plow"),
        ("pyjamas", "pajamas"),
        ("moustache", "mustache"),
    ])
});

/// Demonym → place, applied only under origin-like attribute keys.
pub static DEMONYMS: Lazy<FxHashMap<&'static str, &'static str>> = Lazy::new(|| {
    table(&[
        ("american", "united states"),
        ("british", "united kingdom"),
        ("english", "england"),
        ("scottish", "scotland"),
        ("welsh", "wales"),
        ("irish", "ireland"),
        ("french", "france"),
        ("german", "germany"),
        ("italian", "italy"),
        ("spanish", "spain"),
        ("portuguese", "portugal"),
        ("dutch", "netherlands"),
        ("belgian", "belgium"),
        ("swiss", "switzerland"),
        ("austrian", "austria"),
        ("swedish", "sweden"),
        ("norwegian", "norway"),
        ("danish", "denmark"),
        ("finnish", "finland"),
        ("polish", "poland"),
        ("russian", "russia"),
        ("ukrainian", "ukraine"),
        ("greek", "greece"),
        ("turkish", "turkey"),
        ("indian", "india"),
        ("pakistani", "pakistan"),
        ("bangladeshi", "bangladesh"),
        ("sri lankan", "sri lanka"),
        ("nepali", "nepal"),
        ("chinese", "china"),
        ("japanese", "japan"),
        ("korean", "south korea"),
        ("vietnamese", "vietnam"),
        ("thai", "thailand"),
        ("indonesian", "indonesia"),
        ("malaysian", "malaysia"),
        ("filipino", "philippines"),
        ("australian", "australia"),
        ("canadian", "canada"),
        ("mexican", "mexico"),
        ("brazilian", "brazil"),
        ("argentinian", "argentina"),
        ("chilean", "chile"),
        ("colombian", "colombia"),
        ("peruvian", "peru"),
        ("egyptian", "egypt"),
        ("moroccan", "morocco"),
        ("nigerian", "nigeria"),
        ("kenyan", "kenya"),
        ("ethiopian", "ethiopia"),
        ("south african", "south africa"),
        ("israeli", "israel"),
        ("emirati", "united arab emirates"),
        ("saudi", "saudi arabia"),
        ("iranian", "iran"),
        ("iraqi", "iraq"),
        ("afghan", "afghanistan"),
    ])
});

/// Attribute keys where demonym → place resolution is appropriate.
/// Everything else skips the demonym stage ("english" must stay a language
/// when the attribute is `language`).
pub static DEMONYM_ATTRIBUTES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "nationality",
        "origin",
        "ethnicity",
        "country",
        "region",
        "state",
        "homeland",
        "citizenship",
        "place_of_origin",
        "country_of_origin",
        "made_in",
        "manufactured_in",
    ]
    .into_iter()
    .collect()
});
