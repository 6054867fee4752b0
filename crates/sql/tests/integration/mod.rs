mod parenthesize;
mod statements;
