pub mod image_folder;
pub mod label_dictionary;
pub mod siamese_mnist;
