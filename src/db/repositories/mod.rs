mod domains;
mod segments;
mod sessions;
