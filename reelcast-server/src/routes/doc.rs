use crate::routes::v1;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "reelcast-server",
    description = "reelcast-server API",
    version = "0.1.0",
    contact(name = "reelcast", url = "https://github.com/reelcast/reelcast")
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(v1::api_docs());
    root
}
