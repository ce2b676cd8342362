use crate::models::{NewComment, NewCommunity, NewPost, PostKind};

pub const MAX_TITLE_LENGTH: usize = 300;
pub const MAX_POST_BODY_LENGTH: usize = 40_000;
pub const MAX_COMMENT_LENGTH: usize = 10_000;
pub const MIN_COMMUNITY_NAME_LENGTH: usize = 3;
pub const MAX_COMMUNITY_NAME_LENGTH: usize = 24;
pub const MAX_COMMUNITY_DESCRIPTION_LENGTH: usize = 500;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,
    #[error("Title exceeds maximum length of {MAX_TITLE_LENGTH}")]
    TitleTooLong,
    #[error("Body exceeds maximum length of {MAX_POST_BODY_LENGTH}")]
    BodyTooLong,
    #[error("Link posts need an http(s) URL")]
    MissingUrl,
    #[error("Image posts need an image URL")]
    MissingImage,
    #[error("Comment must not be empty")]
    EmptyComment,
    #[error("Comment exceeds maximum length of {MAX_COMMENT_LENGTH}")]
    CommentTooLong,
    #[error("Community name must be {MIN_COMMUNITY_NAME_LENGTH}-{MAX_COMMUNITY_NAME_LENGTH} characters")]
    BadCommunityName,
    #[error("Slug may only contain lowercase letters, digits and hyphens")]
    BadSlug,
    #[error("Description exceeds maximum length of {MAX_COMMUNITY_DESCRIPTION_LENGTH}")]
    DescriptionTooLong,
}

pub fn validate_new_post(post: &NewPost) -> Result<(), ValidationError> {
    if post.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if post.title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong);
    }
    if post.content.chars().count() > MAX_POST_BODY_LENGTH {
        return Err(ValidationError::BodyTooLong);
    }

    match post.kind {
        PostKind::Link => {
            let has_url = post
                .url
                .as_deref()
                .is_some_and(|url| url.starts_with("http://") || url.starts_with("https://"));
            if !has_url {
                return Err(ValidationError::MissingUrl);
            }
        }
        PostKind::Image => {
            if post.image_url.as_deref().map_or(true, str::is_empty) {
                return Err(ValidationError::MissingImage);
            }
        }
        PostKind::Text => {}
    }

    Ok(())
}

pub fn validate_new_comment(comment: &NewComment) -> Result<(), ValidationError> {
    if comment.content.trim().is_empty() {
        return Err(ValidationError::EmptyComment);
    }
    if comment.content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ValidationError::CommentTooLong);
    }
    Ok(())
}

pub fn validate_new_community(community: &NewCommunity) -> Result<(), ValidationError> {
    let name_len = community.name.chars().count();
    if name_len < MIN_COMMUNITY_NAME_LENGTH || name_len > MAX_COMMUNITY_NAME_LENGTH {
        return Err(ValidationError::BadCommunityName);
    }
    if community.slug.is_empty()
        || !community
            .slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ValidationError::BadSlug);
    }
    if community.description.chars().count() > MAX_COMMUNITY_DESCRIPTION_LENGTH {
        return Err(ValidationError::DescriptionTooLong);
    }
    Ok(())
}
