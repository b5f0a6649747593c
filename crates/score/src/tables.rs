//! Built-in importance tables.

use priorart_model::WeightTable;

/// Element importance for steels; unlisted elements weigh 5.
pub fn element_weights() -> WeightTable {
    WeightTable::new(5.0)
        .with("C", 10.0) // strength and hardenability
        .with("Si", 7.0)
        .with("Mn", 8.0)
        .with("P", 5.0)
        .with("S", 5.0)
        .with("Cr", 9.0) // corrosion resistance
        .with("Mo", 8.0)
        .with("Ni", 9.0)
        .with("V", 7.0)
        .with("Ti", 7.0)
        .with("Nb", 7.0)
        .with("B", 6.0)
        .with("N", 6.0)
        .with("Cu", 7.0)
        .with("Al", 6.0)
        .with("W", 7.0)
        .with("Co", 7.0)
}

/// Phase importance; matrix phases outrank secondary constituents.
pub fn phase_weights() -> WeightTable {
    WeightTable::new(5.0)
        .with("austenite", 10.0)
        .with("ferrite", 10.0)
        .with("martensite", 9.0)
        .with("bainite", 9.0)
        .with("pearlite", 8.0)
        .with("cementite", 8.0)
        .with("carbide", 7.0)
        .with("nitride", 7.0)
        .with("sigma", 6.0)
        .with("delta", 6.0)
}

/// Property importance.
pub fn property_weights() -> WeightTable {
    WeightTable::new(5.0)
        .with("tensileStrength", 10.0)
        .with("yieldStrength", 9.0)
        .with("elongation", 8.0)
        .with("hardness", 7.0)
        .with("impact", 7.0)
        .with("impactValue", 7.0)
        .with("corrosionResistance", 8.0)
        .with("weldability", 7.0)
        .with("formability", 6.0)
}
