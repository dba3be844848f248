/// Token in the prompt template replaced by the rendered posts.
pub const POSTS_PLACEHOLDER: &str = "{{POSTS}}";

/// Renders posts in the given order, each labelled by its position.
pub fn render_posts(posts: &[String]) -> String {
    posts
        .iter()
        .enumerate()
        .map(|(index, post)| format!("{index}:\n{post}\n"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Substitutes the first placeholder in `template` with the rendered posts.
pub fn compose_prompt(template: &str, posts: &[String]) -> String {
    template.replacen(POSTS_PLACEHOLDER, &render_posts(posts), 1)
}
