/// Sanitizes user-authored rich text (post bodies, comments) with ammonia's
/// whitelist: safe formatting tags survive, `<script>`, event handlers and
/// similar are stripped along with their content.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
