pub(crate) const URL_SCHEME: &str = "ob";

/// Maps an `ob:` link to a UI hash route.
///
/// Accepted shapes: `ob:user:GUID`, `ob:user:GUID:store` and
/// `ob:user:GUID:item:ID`. Anything else yields `None`.
pub(crate) fn parse_route(uri: &str) -> Option<String> {
    let mut parts = uri.trim().split(':');
    if parts.next()? != URL_SCHEME {
        return None;
    }

    match parts.next()? {
        "user" => {
            let guid = parts.next().map(str::trim).filter(|guid| !guid.is_empty())?;
            let mut route = format!("#userPage/{guid}");
            match parts.next() {
                Some("store") => route.push_str("/store"),
                Some("item") => {
                    let item = parts.next().map(str::trim).filter(|id| !id.is_empty())?;
                    route.push_str("/item/");
                    route.push_str(item);
                }
                _ => {}
            }
            Some(route)
        }
        _ => None,
    }
}

/// Last routable `ob:` argument, skipping the executable path.
pub(crate) fn route_from_args<I, S>(args: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .skip(1)
        .filter_map(|arg| parse_route(arg.as_ref()))
        .last()
}

/// Script that moves a loaded UI to `route`.
pub(crate) fn navigate_script(route: &str) -> String {
    let encoded = serde_json::to_string(route).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(function(route){{if(window.Backbone&&window.Backbone.history){{window.Backbone.history.navigate(route,{{trigger:true}});}}else{{window.location.hash=route;}}}})({encoded});"
    )
}
