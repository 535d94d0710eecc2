pub mod local_user;
