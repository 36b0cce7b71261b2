//! Path templates for the IBGE API.
//!
//! A small set of known indicator names maps to dedicated endpoint shapes;
//! anything else falls back to the generic indicator lookup. Locality and
//! period lists are joined with `|`, the separator the upstream expects.

/// Build the upstream path for one indicator query.
pub fn indicator_path(indicator: &str, localities: &[String], periods: Option<&[String]>) -> String {
    let locs = localities.join("|");
    let periods = periods.map(|p| p.join("|")).unwrap_or_default();

    match indicator {
        // Population estimates take localities as a path segment and
        // periods as a singular query parameter.
        "populacao" => {
            let mut path = format!("/populacao/estimativa/{locs}");
            if !periods.is_empty() {
                path.push_str(&format!("?periodo={periods}"));
            }
            path
        }
        "densidade" => query_style("/pesquisas/censo/indicadores", &locs, &periods),
        "pib" => query_style("/economia/pib/municipal", &locs, &periods),
        "alfabetizacao" => query_style("/educacao/indicadores", &locs, &periods),
        other => {
            let base = format!("/indicadores/{}", urlencoding::encode(other));
            query_style(&base, &locs, &periods)
        }
    }
}

fn query_style(base: &str, localities: &str, periods: &str) -> String {
    let mut path = format!("{base}?localidades={localities}");
    if !periods.is_empty() {
        path.push_str(&format!("&periodos={periods}"));
    }
    path
}

/// Build the aggregates data path:
/// `/agregados/{codigo}/periodos/{periodos}/variaveis[/{variaveis}]?localidades=`.
pub fn aggregate_data_path(
    codigo: &str,
    periodos: &str,
    variaveis: Option<&str>,
    localidades: &str,
) -> String {
    let mut path = format!("/agregados/{codigo}/periodos/{periodos}/variaveis");
    if let Some(vars) = variaveis {
        path.push_str(&format!("/{vars}"));
    }
    path.push_str(&format!("?localidades={localidades}"));
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_populacao_uses_path_segment_localities() {
        let path = indicator_path("populacao", &locs(&["UF33", "UF35"]), None);
        assert_eq!(path, "/populacao/estimativa/UF33|UF35");
    }

    #[test]
    fn test_populacao_periods_become_periodo_query() {
        let path = indicator_path(
            "populacao",
            &locs(&["BR"]),
            Some(&locs(&["2021", "2022"])),
        );
        assert_eq!(path, "/populacao/estimativa/BR?periodo=2021|2022");
    }

    #[test]
    fn test_known_indicators_use_query_style() {
        let path = indicator_path("pib", &locs(&["BR"]), Some(&locs(&["2020"])));
        assert_eq!(path, "/economia/pib/municipal?localidades=BR&periodos=2020");

        let path = indicator_path("densidade", &locs(&["UF33"]), None);
        assert_eq!(path, "/pesquisas/censo/indicadores?localidades=UF33");

        let path = indicator_path("alfabetizacao", &locs(&["BR"]), None);
        assert_eq!(path, "/educacao/indicadores?localidades=BR");
    }

    #[test]
    fn test_unknown_indicator_falls_back_to_generic_lookup() {
        let path = indicator_path("idh", &locs(&["BR"]), Some(&locs(&["2021"])));
        assert_eq!(path, "/indicadores/idh?localidades=BR&periodos=2021");
    }

    #[test]
    fn test_unknown_indicator_is_url_encoded() {
        let path = indicator_path("taxa de ocupação", &locs(&["BR"]), None);
        assert_eq!(
            path,
            "/indicadores/taxa%20de%20ocupa%C3%A7%C3%A3o?localidades=BR"
        );
    }

    #[test]
    fn test_aggregate_data_path_without_variables() {
        assert_eq!(
            aggregate_data_path("1301", "ultimo", None, "BR"),
            "/agregados/1301/periodos/ultimo/variaveis?localidades=BR"
        );
    }

    #[test]
    fn test_aggregate_data_path_with_variables_and_periods() {
        assert_eq!(
            aggregate_data_path("1378", "2019|2020", Some("37"), "UF33"),
            "/agregados/1378/periodos/2019|2020/variaveis/37?localidades=UF33"
        );
    }
}
