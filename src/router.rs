//! Regex based router. Routes are tried in the order they were added.

use regex::Regex;

type ParamsConverter<T> = Box<Fn(Vec<&str>) -> Option<T> + Send + Sync>;

pub struct RouteParser<T> {
    regex_and_converters: Vec<(Regex, ParamsConverter<T>)>,
}

impl<T> Default for RouteParser<T> {
    fn default() -> Self {
        RouteParser {
            regex_and_converters: Vec::new(),
        }
    }
}

impl<T> RouteParser<T> {
    /// Adds a route without parameters
    pub fn add_route<F>(&mut self, regex_pattern: &str, f: F) -> &mut Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.add_route_with_params(regex_pattern, move |_| Some(f()))
    }

    /// Adds a route whose capture groups are converted by `converter`.
    /// A `None` from the converter lets the next routes try the path.
    pub fn add_route_with_params<F>(&mut self, regex_pattern: &str, converter: F) -> &mut Self
    where
        F: Fn(Vec<&str>) -> Option<T> + Send + Sync + 'static,
    {
        let regex = Regex::new(regex_pattern).unwrap_or_else(|e| panic!("Invalid route {}: {}", regex_pattern, e));
        self.regex_and_converters.push((regex, Box::new(converter)));
        self
    }

    /// Route of the path, `None` for unknown paths
    pub fn test(&self, route: &str) -> Option<T> {
        self.regex_and_converters
            .iter()
            .filter_map(|&(ref regex, ref converter)| {
                regex.captures(route).and_then(|captures| {
                    let params = captures.iter().skip(1).filter_map(|m| m.map(|m| m.as_str())).collect::<Vec<&str>>();
                    (**converter)(params)
                })
            })
            .next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Route {
        Lots,
        Lot(u32),
        LotBySlug(String),
    }

    fn parser() -> RouteParser<Route> {
        let mut parser = RouteParser::default();
        parser.add_route(r"^/lots$", || Route::Lots);
        parser.add_route_with_params(r"^/lots/(\d+)$", |params| params.get(0).and_then(|id| id.parse().ok()).map(Route::Lot));
        parser.add_route_with_params(r"^/lots/([a-z0-9-]+)$", |params| params.get(0).map(|slug| Route::LotBySlug(slug.to_string())));
        parser
    }

    #[test]
    fn test_plain_route() {
        assert_eq!(parser().test("/lots"), Some(Route::Lots));
        assert_eq!(parser().test("/lots/"), None);
    }

    #[test]
    fn test_params_and_fallthrough() {
        assert_eq!(parser().test("/lots/42"), Some(Route::Lot(42)));
        // too big for u32, so the next route gets it
        assert_eq!(
            parser().test("/lots/99999999999"),
            Some(Route::LotBySlug("99999999999".to_string()))
        );
        assert_eq!(parser().test("/lots/north-side"), Some(Route::LotBySlug("north-side".to_string())));
        assert_eq!(parser().test("/garages"), None);
    }
}
