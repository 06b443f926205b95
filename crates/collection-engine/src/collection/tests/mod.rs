mod common;

mod dispatcher;
