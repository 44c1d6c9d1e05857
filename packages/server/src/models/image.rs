use serde::{Deserialize, Serialize};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct IngredientImageRequest {
    /// Free-form ingredient label.
    #[schema(example = "Tomate Cherry")]
    pub label: String,
    /// Owner whose private namespace receives the copy.
    #[schema(example = "u_1024")]
    pub owner_id: String,
    pub context: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RecipeImageRequest {
    #[schema(example = "Paella Valenciana")]
    pub title: String,
    /// Short description used to steer generation.
    #[schema(example = "Rice with rabbit, green beans and saffron")]
    pub context: Option<String>,
}

/// Always carries a usable URL; failures resolve to a placeholder.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageUrlResponse {
    #[schema(example = "http://127.0.0.1:3000/blobs/recipes/paella_valenciana.png")]
    pub url: String,
}
