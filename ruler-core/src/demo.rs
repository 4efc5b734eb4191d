//! # Padrões e Textos de Demonstração
//!
//! Conjunto pequeno de padrões (frases e sequências de tokens) usado pela
//! interface web e pelos testes de ponta a ponta.

use serde_json::json;

use crate::error::Result;
use crate::pattern::EntityPattern;

const MONTHS: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho",
    "julho", "agosto", "setembro", "outubro", "novembro", "dezembro",
];

/// Padrões de demonstração.
pub fn demo_patterns() -> Result<Vec<EntityPattern>> {
    let mut patterns = Vec::new();

    for (org, id) in [
        ("Instituto Butantan", "butantan"),
        ("Fiocruz", "fiocruz"),
        ("Fundação Oswaldo Cruz", "fiocruz"),
        ("Anvisa", "anvisa"),
        ("Nubank", "nubank"),
        ("Embraer", "embraer"),
        ("Boeing", "boeing"),
        ("Petrobras", "petrobras"),
        ("Banco Central do Brasil", "bcb"),
        ("Supremo Tribunal Federal", "stf"),
        ("STF", "stf"),
        ("Real Madrid", "real-madrid"),
        ("Apple", "apple"),
    ] {
        patterns.push(EntityPattern::phrase("ORG", org).with_id(id));
    }

    for loc in ["São Paulo", "Brasil", "Brasília", "Paris", "Rio de Janeiro", "México", "Colômbia"] {
        patterns.push(EntityPattern::phrase("LOC", loc));
    }

    for (person, id) in [
        ("Margareth Dalcolmo", "dalcolmo"),
        ("David Vélez", "velez"),
        ("Cristina Junqueira", "junqueira"),
        ("Dom Pedro I", "pedro-i"),
        ("Princesa Isabel", "isabel"),
        ("Tarsila do Amaral", "tarsila"),
    ] {
        patterns.push(EntityPattern::phrase("PER", person).with_id(id));
    }

    // cargo seguido de nome próprio: "Ministro Luís Roberto Barroso"
    patterns.push(EntityPattern::tokens(
        "PER",
        json!([
            {"LOWER": {"IN": ["ministro", "ministra", "presidente", "técnico", "pesquisadora", "bióloga"]}},
            {"IS_TITLE": true, "OP": "{1,3}"}
        ]),
    )?);

    // "7 de setembro de 1822"
    patterns.push(EntityPattern::tokens(
        "DATE",
        json!([
            {"IS_DIGIT": true, "LENGTH": {"<=": 2}},
            {"LOWER": "de"},
            {"LOWER": {"IN": MONTHS}},
            {"LOWER": "de", "OP": "?"},
            {"IS_DIGIT": true, "LENGTH": 4, "OP": "?"}
        ]),
    )?);

    Ok(patterns)
}

/// Textos de demonstração para a interface web.
pub fn demo_texts() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "Saúde",
            "O Instituto Butantan e a Fundação Oswaldo Cruz (Fiocruz), em São Paulo e no Rio de Janeiro, lideram pesquisas sobre doenças tropicais. A Anvisa aprovou protocolos desenvolvidos pela pesquisadora Margareth Dalcolmo.",
        ),
        (
            "História",
            "Em 7 de setembro de 1822, Dom Pedro I proclamou a Independência do Brasil. A Princesa Isabel sancionou a Lei Áurea em 13 de maio de 1888.",
        ),
        (
            "Tecnologia",
            "O Nubank, fundado por David Vélez e Cristina Junqueira, expandiu operações para o México e a Colômbia. A Embraer anunciou uma parceria com a Boeing.",
        ),
        (
            "Direito",
            "O Supremo Tribunal Federal (STF), sob a presidência do Ministro Luís Roberto Barroso, julgou a Emenda Constitucional em Brasília.",
        ),
        (
            "Inglês",
            "Apple is opening its first big office in San Francisco. The left is starting to take aim at Democratic front-runner Joe Biden.",
        ),
    ]
}
